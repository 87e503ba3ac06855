use std::collections::hash_map::{Entry, HashMap};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Ride, RideStatus};
use crate::entities::{chat_message, user};
use crate::error::{AppError, AppResult};
use crate::notify::{NewNotification, NotificationKind, Priority};
use crate::utils::jwt::Claims;
use crate::AppState;

const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

/// One ride's chat as seen from the conversation list.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub ride_id: Uuid,
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
    pub status: RideStatus,
    pub participants: usize,
    pub message_count: usize,
    pub last_message: chat_message::Model,
}

/// Group messages by ride, keeping only rides with messages. Most recent
/// activity first; `messages` may arrive in any order.
fn conversations(rides: &[Ride], messages: Vec<chat_message::Model>) -> Vec<Conversation> {
    let mut by_ride: HashMap<Uuid, (usize, chat_message::Model)> = HashMap::new();
    for message in messages {
        match by_ride.entry(message.ride_id) {
            Entry::Occupied(mut seen) => {
                let (count, last) = seen.get_mut();
                *count += 1;
                if message.created_at > last.created_at {
                    *last = message;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert((1, message));
            }
        }
    }

    let mut list: Vec<Conversation> = rides
        .iter()
        .filter_map(|ride| {
            let (message_count, last_message) = by_ride.remove(&ride.id)?;
            Some(Conversation {
                ride_id: ride.id,
                from: ride.from.clone(),
                to: ride.to.clone(),
                date: ride.date,
                status: ride.status,
                participants: 1 + ride.passengers.len(),
                message_count,
                last_message,
            })
        })
        .collect();

    list.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
    list
}

async fn participant_ride(state: &AppState, ride_id: Uuid, user_id: Uuid) -> AppResult<Ride> {
    let ride = state.engine.get_ride(ride_id).await?;
    if !ride.is_participant(user_id) {
        return Err(AppError::Forbidden(
            "Only the driver and passengers can use this chat".to_string(),
        ));
    }
    Ok(ride)
}

/// List a ride's chat, oldest first
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<Vec<chat_message::Model>>> {
    participant_ride(&state, ride_id, claims.sub).await?;

    let messages = chat_message::Entity::find()
        .filter(chat_message::Column::RideId.eq(ride_id))
        .order_by_asc(chat_message::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(messages))
}

/// Every ride chat the caller takes part in
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<Conversation>>> {
    let rides = state.engine.participant_rides(claims.sub).await?;
    if rides.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let ride_ids: Vec<Uuid> = rides.iter().map(|r| r.id).collect();
    let messages = chat_message::Entity::find()
        .filter(chat_message::Column::RideId.is_in(ride_ids))
        .all(&state.db)
        .await?;

    Ok(Json(conversations(&rides, messages)))
}

/// Post to a ride's chat and notify the other participants
pub async fn post_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<chat_message::Model>)> {
    let text = payload.message.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_LEN
        )));
    }

    let ride = participant_ride(&state, ride_id, claims.sub).await?;

    let author = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    let message = chat_message::ActiveModel {
        id: Set(Uuid::new_v4()),
        ride_id: Set(ride_id),
        user_id: Set(author.id),
        user_name: Set(author.name.clone()),
        message: Set(text),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.db)
    .await?;

    let recipients = std::iter::once(ride.driver.user_id)
        .chain(ride.passengers.iter().map(|p| p.user_id))
        .filter(|id| *id != author.id);

    let batch = recipients
        .map(|recipient| {
            NewNotification::new(
                recipient,
                NotificationKind::NewMessage,
                "New Message",
                format!("{}: {}", author.name, message.message),
            )
            .priority(Priority::Low)
            .metadata(serde_json::json!({
                "ride_id": ride_id,
                "message_id": message.id,
            }))
        })
        .collect();
    state.engine.notifier().dispatch(batch);

    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ride::tests::ride_with_seats;
    use crate::domain::Booking;
    use chrono::Duration;

    fn message(ride_id: Uuid, text: &str, minutes_ago: i64) -> chat_message::Model {
        chat_message::Model {
            id: Uuid::new_v4(),
            ride_id,
            user_id: Uuid::new_v4(),
            user_name: "Ravi".to_string(),
            message: text.to_string(),
            created_at: (Utc::now() - Duration::minutes(minutes_ago)).into(),
        }
    }

    #[test]
    fn test_conversations_group_by_ride_newest_first() {
        let quiet = ride_with_seats(2);
        let mut busy = ride_with_seats(3);
        busy.add_passenger(Booking::confirmed(Uuid::new_v4(), 1, Utc::now()));
        let silent = ride_with_seats(1);

        let messages = vec![
            message(busy.id, "leaving soon", 30),
            message(quiet.id, "hello", 10),
            message(busy.id, "at the gate", 5),
            message(busy.id, "running late", 20),
        ];

        let list = conversations(&[quiet.clone(), busy.clone(), silent], messages);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].ride_id, busy.id);
        assert_eq!(list[0].message_count, 3);
        assert_eq!(list[0].last_message.message, "at the gate");
        assert_eq!(list[0].participants, 2);
        assert_eq!(list[1].ride_id, quiet.id);
        assert_eq!(list[1].message_count, 1);
    }
}
