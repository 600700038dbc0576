use sea_orm::*;

use crate::auth::hash_password;
use crate::config::AdminBootstrap;
use crate::domain::{ActivitySink, DomainError, RoomType, StudentStatus, UserRole};
use crate::models::{admin, building, user};
use crate::services::building_service::{self, BuildingInput};
use crate::services::in_transaction;
use crate::services::room_service::{self, CreateRoomInput};

/// Create the bootstrap administrator unless the username already exists.
/// Returns whether an account was created.
pub async fn ensure_admin(
    db: &DatabaseConnection,
    bootstrap: &AdminBootstrap,
) -> Result<bool, DomainError> {
    let exists = user::Entity::find()
        .filter(user::Column::Username.eq(bootstrap.username.as_str()))
        .count(db)
        .await?;
    if exists > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(&bootstrap.password).map_err(DomainError::Internal)?;
    let username = bootstrap.username.clone();
    let bootstrap = bootstrap.clone();

    in_transaction(db, move |txn| {
        Box::pin(async move {
            let now = chrono::Utc::now().to_rfc3339();
            let account = user::ActiveModel {
                username: Set(bootstrap.username.clone()),
                email: Set(bootstrap.email),
                password_hash: Set(password_hash),
                role: Set(UserRole::Admin),
                status: Set(StudentStatus::Active),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            admin::ActiveModel {
                user_id: Set(account.id),
                full_name: Set(bootstrap.username),
                position: Set(Some("Administrator".to_owned())),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            Ok(())
        })
    })
    .await?;

    tracing::info!("👤 Bootstrap administrator '{}' created", username);
    Ok(true)
}

/// Two buildings with a handful of rooms. Skipped when any building exists.
pub async fn seed_demo_data(
    db: &DatabaseConnection,
    activity: &dyn ActivitySink,
) -> Result<(), DomainError> {
    if building::Entity::find().count(db).await? > 0 {
        tracing::info!("Buildings already present, skipping demo seed");
        return Ok(());
    }

    let layout = [
        ("Block A", "North campus", RoomType::Male),
        ("Block B", "South campus", RoomType::Female),
    ];

    for (name, address, room_type) in layout {
        let block = building_service::create_building(
            db,
            activity,
            None,
            BuildingInput {
                name: name.to_owned(),
                address: Some(address.to_owned()),
                description: None,
            },
        )
        .await?;

        for (floor, capacity, price) in [(1, 4, 800_000.0), (2, 2, 1_200_000.0)] {
            for n in 1..=3 {
                room_service::create_room(
                    db,
                    activity,
                    None,
                    CreateRoomInput {
                        building_id: block.id,
                        room_number: format!("{}{:02}", floor, n),
                        room_type,
                        capacity,
                        price_per_month: price,
                    },
                )
                .await?;
            }
        }

        room_service::create_room(
            db,
            activity,
            None,
            CreateRoomInput {
                building_id: block.id,
                room_number: "301".to_owned(),
                room_type: RoomType::Mixed,
                capacity: 6,
                price_per_month: 600_000.0,
            },
        )
        .await?;
    }

    Ok(())
}
