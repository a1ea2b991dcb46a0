//! Row-visibility predicates, kept in one place so the access table reads as
//! a table. Handlers either call these against a loaded row or scope their
//! queries to the same effect.

use crate::identity::Identity;
use crate::models::{ReceptionNotification, Ticket};

/// Tenants see their own tickets; admin and central_atendimento see all.
/// Recepcao has no ticket visibility beyond its own.
pub fn can_view_ticket(identity: &Identity, ticket: &Ticket) -> bool {
    ticket.user_id == identity.user_id || identity.caps.is_central_atendimento
}

/// Status and admin notes are staff-side fields.
pub fn can_update_ticket(identity: &Identity) -> bool {
    identity.caps.is_central_atendimento
}

/// Any participant on the ticket may append a comment.
pub fn can_comment_on_ticket(identity: &Identity, ticket: &Ticket) -> bool {
    can_view_ticket(identity, ticket)
}

/// Announcements, menu items and message templates share one mutation rule.
pub fn can_manage_content(identity: &Identity) -> bool {
    identity.caps.is_central_atendimento
}

pub fn can_send_notification(identity: &Identity) -> bool {
    identity.caps.is_recepcao || identity.caps.is_central_atendimento
}

/// Senders (any reception-side role) read all notifications; recipients read
/// their own.
pub fn can_view_notification(identity: &Identity, notification: &ReceptionNotification) -> bool {
    notification.recipient_id == identity.user_id || can_send_notification(identity)
}

/// Response and read-flag mutations belong to the recipient alone, senders
/// included being denied.
pub fn is_notification_recipient(
    identity: &Identity,
    notification: &ReceptionNotification,
) -> bool {
    notification.recipient_id == identity.user_id
}

/// The profile directory is staff-facing; tenants only ever see their own row.
pub fn can_list_profiles(identity: &Identity) -> bool {
    identity.caps.is_staff
}

/// The directory masks the national ID for recepcao (the "secure" variant).
pub fn masks_cpf(identity: &Identity) -> bool {
    identity.caps.is_recepcao
}

pub fn can_manage_users(identity: &Identity) -> bool {
    identity.caps.is_admin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::capabilities::{Capabilities, Role};
    use chrono::Utc;
    use uuid::Uuid;

    fn identity(role: Option<Role>) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "x@example.com".into(),
            profile: None,
            floor: None,
            role,
            caps: Capabilities::derive(role),
        }
    }

    fn ticket_owned_by(user_id: Uuid) -> Ticket {
        let now = Utc::now().naive_utc();
        Ticket {
            id: Uuid::new_v4(),
            user_id,
            title: "Instalar tomada".into(),
            description: "Sala 402".into(),
            status: "pending".into(),
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tenant_sees_only_own_ticket() {
        let tenant = identity(Some(Role::Tenant));
        let own = ticket_owned_by(tenant.user_id);
        let other = ticket_owned_by(Uuid::new_v4());
        assert!(can_view_ticket(&tenant, &own));
        assert!(!can_view_ticket(&tenant, &other));
    }

    #[test]
    fn central_sees_and_updates_any_ticket() {
        let central = identity(Some(Role::CentralAtendimento));
        let other = ticket_owned_by(Uuid::new_v4());
        assert!(can_view_ticket(&central, &other));
        assert!(can_update_ticket(&central));
    }

    #[test]
    fn recepcao_neither_sees_nor_updates_foreign_tickets() {
        let recepcao = identity(Some(Role::Recepcao));
        let other = ticket_owned_by(Uuid::new_v4());
        assert!(!can_view_ticket(&recepcao, &other));
        assert!(!can_update_ticket(&recepcao));
        // But reception does send notifications and read the directory.
        assert!(can_send_notification(&recepcao));
        assert!(can_list_profiles(&recepcao));
        assert!(masks_cpf(&recepcao));
    }

    #[test]
    fn only_admin_manages_users() {
        assert!(can_manage_users(&identity(Some(Role::Admin))));
        assert!(!can_manage_users(&identity(Some(Role::CentralAtendimento))));
        assert!(!can_manage_users(&identity(Some(Role::Recepcao))));
        assert!(!can_manage_users(&identity(Some(Role::Tenant))));
        assert!(!can_manage_users(&identity(None)));
    }
}
