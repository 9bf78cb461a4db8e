use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Page;
use crate::database::models::Message;
use crate::database::DatabaseError;

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, subject, body, read_at, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mailbox {
    #[default]
    Inbox,
    Sent,
}

impl std::str::FromStr for Mailbox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Mailbox::Inbox),
            "sent" => Ok(Mailbox::Sent),
            other => Err(format!("unknown mailbox '{}'", other)),
        }
    }
}

pub async fn send(
    pool: &PgPool,
    sender_id: Uuid,
    recipient_id: Uuid,
    subject: &str,
    body: &str,
) -> Result<Message, DatabaseError> {
    let sql = format!(
        "INSERT INTO messages (sender_id, recipient_id, subject, body)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        MESSAGE_COLUMNS
    );
    Ok(sqlx::query_as::<_, Message>(&sql)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(subject.trim())
        .bind(body)
        .fetch_one(pool)
        .await?)
}

pub async fn list(pool: &PgPool, user_id: Uuid, mailbox: Mailbox, page: Page) -> Result<Vec<Message>, DatabaseError> {
    let column = match mailbox {
        Mailbox::Inbox => "recipient_id",
        Mailbox::Sent => "sender_id",
    };
    let sql = format!(
        "SELECT {} FROM messages WHERE {} = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        MESSAGE_COLUMNS, column
    );
    Ok(sqlx::query_as::<_, Message>(&sql)
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Message>, DatabaseError> {
    let sql = format!("SELECT {} FROM messages WHERE id = $1", MESSAGE_COLUMNS);
    Ok(sqlx::query_as::<_, Message>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn mark_read(pool: &PgPool, id: Uuid) -> Result<Message, DatabaseError> {
    let sql = format!(
        "UPDATE messages SET read_at = COALESCE(read_at, now()) WHERE id = $1 RETURNING {}",
        MESSAGE_COLUMNS
    );
    sqlx::query_as::<_, Message>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Message {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mailbox() {
        assert_eq!("inbox".parse::<Mailbox>(), Ok(Mailbox::Inbox));
        assert_eq!("sent".parse::<Mailbox>(), Ok(Mailbox::Sent));
        assert!("trash".parse::<Mailbox>().is_err());
    }
}
