use std::env;

use anyhow::{Context, Result};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use backend::{
    auth::capabilities::Role,
    auth::password,
    config::AppConfig,
    db,
    models::{NewFloor, NewProfile, NewReceptionMessage, NewUser, NewUserRole},
    schema::{floors, profiles, reception_messages, user_roles, users},
};

const ADMIN_EMAIL: &str = "admin@boldworkplace.com.br";
const ADMIN_FULL_NAME: &str = "Administrador Bold";

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("setup-admin") => {
            let admin_password = env::var("ADMIN_PASSWORD")
                .context("ADMIN_PASSWORD must be set for setup-admin")?;
            setup_admin(&admin_password)?;
        }
        Some("seed-floors") => seed_floors()?,
        Some("seed-reception-messages") => seed_reception_messages()?,
        Some(cmd) => {
            eprintln!(
                "Unknown command: {cmd}\nUsage: provision <setup-admin|seed-floors|seed-reception-messages>"
            );
            std::process::exit(1);
        }
        None => {
            eprintln!("Usage: provision <setup-admin|seed-floors|seed-reception-messages>");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>>
{
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "provision",
        database_url = %config.redacted_database_url(),
        "loaded backend configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    db::run_migrations(&pool)?;
    pool.get().context("failed to get database connection")
}

/// Idempotently create the fixed admin account: identity, profile on the
/// 12th floor, admin role.
fn setup_admin(admin_password: &str) -> Result<()> {
    let mut conn = connect()?;

    let existing: Option<Uuid> = users::table
        .filter(users::email.eq(ADMIN_EMAIL))
        .select(users::id)
        .first(&mut conn)
        .optional()?;

    if let Some(user_id) = existing {
        println!("Admin user already exists ({user_id}).");
        return Ok(());
    }

    let password_hash = password::hash_password(admin_password)?;
    let twelfth_floor: Option<Uuid> = floors::table
        .filter(floors::floor_number.eq(12))
        .select(floors::id)
        .first(&mut conn)
        .optional()?;

    let user_id = Uuid::new_v4();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(users::table)
            .values(&NewUser {
                id: user_id,
                email: ADMIN_EMAIL.to_string(),
                password_hash: password_hash.clone(),
            })
            .execute(conn)?;

        diesel::insert_into(profiles::table)
            .values(&NewProfile {
                id: Uuid::new_v4(),
                user_id,
                full_name: ADMIN_FULL_NAME.to_string(),
                cpf: "00000000000".to_string(),
                company: "Bold Workplace".to_string(),
                floor_id: twelfth_floor,
                room: "Admin".to_string(),
            })
            .execute(conn)?;

        diesel::insert_into(user_roles::table)
            .values(&NewUserRole {
                id: Uuid::new_v4(),
                user_id,
                role: Role::Admin.as_str().to_string(),
            })
            .execute(conn)?;

        Ok(())
    })?;

    println!("Admin user created ({user_id}).");
    Ok(())
}

/// Insert the building's floor reference rows that are missing. The 2nd
/// floor stays unavailable while under renovation; the 12th carries the
/// shared amenities.
fn seed_floors() -> Result<()> {
    let mut conn = connect()?;

    let seeds = [
        (2, "2º andar", false, false),
        (3, "3º andar", true, false),
        (5, "5º andar", true, false),
        (6, "6º andar", true, false),
        (9, "9º andar", true, false),
        (11, "11º andar", true, false),
        (12, "12º andar", true, true),
    ];

    let mut created = 0;
    for (number, name, available, premium) in seeds {
        let exists: Option<Uuid> = floors::table
            .filter(floors::floor_number.eq(number))
            .select(floors::id)
            .first(&mut conn)
            .optional()?;
        if exists.is_some() {
            continue;
        }

        let features = premium.then(|| {
            vec![
                "Cafeteria".to_string(),
                "Salas de reunião".to_string(),
                "Rooftop".to_string(),
            ]
        });

        diesel::insert_into(floors::table)
            .values(&NewFloor {
                id: Uuid::new_v4(),
                floor_number: number,
                name: name.to_string(),
                description: (number == 2).then(|| "Em reforma".to_string()),
                is_available: available,
                is_premium: premium,
                features,
            })
            .execute(&mut conn)?;
        created += 1;
    }

    println!("Seeded {created} floor(s).");
    Ok(())
}

fn seed_reception_messages() -> Result<()> {
    let mut conn = connect()?;

    struct Seed {
        title: &'static str,
        content: &'static str,
        category: &'static str,
        input_label: Option<&'static str>,
        input_placeholder: Option<&'static str>,
    }

    let seeds = [
        Seed {
            title: "Encomenda na recepção",
            content: "Há uma encomenda aguardando retirada na recepção.",
            category: "entregas",
            input_label: Some("Código de retirada"),
            input_placeholder: Some("Ex.: BR-0042"),
        },
        Seed {
            title: "Visitante aguardando",
            content: "Um visitante aguarda na recepção.",
            category: "visitas",
            input_label: Some("Nome do visitante"),
            input_placeholder: Some("Ex.: Maria Silva"),
        },
        Seed {
            title: "Correspondência disponível",
            content: "Nova correspondência disponível para retirada.",
            category: "entregas",
            input_label: None,
            input_placeholder: None,
        },
    ];

    let mut created = 0;
    for (index, seed) in seeds.iter().enumerate() {
        let exists: Option<Uuid> = reception_messages::table
            .filter(reception_messages::title.eq(seed.title))
            .select(reception_messages::id)
            .first(&mut conn)
            .optional()?;
        if exists.is_some() {
            continue;
        }

        diesel::insert_into(reception_messages::table)
            .values(&NewReceptionMessage {
                id: Uuid::new_v4(),
                title: seed.title.to_string(),
                content: seed.content.to_string(),
                category: Some(seed.category.to_string()),
                has_input_field: seed.input_label.is_some(),
                input_field_label: seed.input_label.map(str::to_string),
                input_field_placeholder: seed.input_placeholder.map(str::to_string),
                is_active: true,
                sort_order: index as i32,
            })
            .execute(&mut conn)?;
        created += 1;
    }

    println!("Seeded {created} reception message(s).");
    Ok(())
}
