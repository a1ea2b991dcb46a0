use serde::Serialize;

/// One role per account, stored as a string in `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Tenant,
    Recepcao,
    CentralAtendimento,
}

impl Role {
    /// Role written for freshly created accounts.
    pub const DEFAULT: Role = Role::Tenant;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Tenant => "tenant",
            Role::Recepcao => "recepcao",
            Role::CentralAtendimento => "central_atendimento",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "admin" => Some(Role::Admin),
            "tenant" => Some(Role::Tenant),
            "recepcao" => Some(Role::Recepcao),
            "central_atendimento" => Some(Role::CentralAtendimento),
            _ => None,
        }
    }
}

/// Coarse capability flags derived from the resolved role. An account with no
/// role row (or an unknown role string) derives all-false and is denied
/// everywhere.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Capabilities {
    pub is_admin: bool,
    pub is_central_atendimento: bool,
    pub is_recepcao: bool,
    pub is_cliente: bool,
    /// Staff is "any role except tenant" (a negation, not an enumerated
    /// role), but it still requires a resolved role so that an account with
    /// no role row stays locked out of staff surfaces.
    pub is_staff: bool,
}

impl Capabilities {
    pub fn derive(role: Option<Role>) -> Self {
        let Some(role) = role else {
            return Self::default();
        };
        Self {
            is_admin: role == Role::Admin,
            is_central_atendimento: matches!(role, Role::CentralAtendimento | Role::Admin),
            is_recepcao: role == Role::Recepcao,
            is_cliente: role == Role::Tenant,
            is_staff: role != Role::Tenant,
        }
    }
}

/// Access requirement for a route. Recepcao routes also admit
/// central_atendimento/admin, but central_atendimento routes do not admit
/// recepcao. That asymmetry is intentional and must not be "fixed" here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGate {
    Admin,
    CentralAtendimento,
    Recepcao,
    Cliente,
    Staff,
}

impl RoleGate {
    pub fn allows(&self, caps: &Capabilities) -> bool {
        match self {
            RoleGate::Admin => caps.is_admin,
            RoleGate::CentralAtendimento => caps.is_central_atendimento,
            RoleGate::Recepcao => caps.is_recepcao || caps.is_central_atendimento,
            RoleGate::Cliente => caps.is_cliente,
            RoleGate::Staff => caps.is_staff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, Role, RoleGate};

    fn caps(role: Role) -> Capabilities {
        Capabilities::derive(Some(role))
    }

    #[test]
    fn flags_are_mutually_exclusive_except_central_overlap() {
        let admin = caps(Role::Admin);
        assert!(admin.is_admin && admin.is_central_atendimento);
        assert!(!admin.is_recepcao && !admin.is_cliente);

        let central = caps(Role::CentralAtendimento);
        assert!(!central.is_admin && central.is_central_atendimento);
        assert!(!central.is_recepcao && !central.is_cliente);

        let recepcao = caps(Role::Recepcao);
        assert!(!recepcao.is_admin && !recepcao.is_central_atendimento);
        assert!(recepcao.is_recepcao && !recepcao.is_cliente);

        let tenant = caps(Role::Tenant);
        assert!(!tenant.is_admin && !tenant.is_central_atendimento);
        assert!(!tenant.is_recepcao && tenant.is_cliente);
    }

    #[test]
    fn missing_role_derives_no_capabilities() {
        let none = Capabilities::derive(None);
        assert!(!none.is_admin);
        assert!(!none.is_central_atendimento);
        assert!(!none.is_recepcao);
        assert!(!none.is_cliente);
        assert!(!none.is_staff);
        assert!(!RoleGate::Admin.allows(&none));
        assert!(!RoleGate::CentralAtendimento.allows(&none));
        assert!(!RoleGate::Recepcao.allows(&none));
        assert!(!RoleGate::Cliente.allows(&none));
        assert!(!RoleGate::Staff.allows(&none));
    }

    #[test]
    fn recepcao_gate_admits_central_but_not_vice_versa() {
        assert!(RoleGate::Recepcao.allows(&caps(Role::Recepcao)));
        assert!(RoleGate::Recepcao.allows(&caps(Role::CentralAtendimento)));
        assert!(RoleGate::Recepcao.allows(&caps(Role::Admin)));

        assert!(!RoleGate::CentralAtendimento.allows(&caps(Role::Recepcao)));
        assert!(RoleGate::CentralAtendimento.allows(&caps(Role::CentralAtendimento)));
        assert!(RoleGate::CentralAtendimento.allows(&caps(Role::Admin)));
    }

    #[test]
    fn staff_gate_is_everyone_but_clients() {
        assert!(RoleGate::Staff.allows(&caps(Role::Admin)));
        assert!(RoleGate::Staff.allows(&caps(Role::CentralAtendimento)));
        assert!(RoleGate::Staff.allows(&caps(Role::Recepcao)));
        assert!(!RoleGate::Staff.allows(&caps(Role::Tenant)));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            Role::Admin,
            Role::Tenant,
            Role::Recepcao,
            Role::CentralAtendimento,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("gerente"), None);
    }
}
