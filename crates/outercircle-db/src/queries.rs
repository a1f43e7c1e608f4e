use outercircle_types::models::{Code, CodeGroup, Message, NewMessage};
use rusqlite::{Connection, OptionalExtension};

use crate::MessageStore;
use crate::error::{Result, StoreError};
use crate::models::{MessageRow, format_timestamp};
use crate::sqlite::SqliteStore;

impl MessageStore for SqliteStore {
    fn code_exists(&self, code: &Code) -> Result<bool> {
        self.with_conn(|conn| query_code_exists(conn, code))
    }

    fn create_code(&self, code: &Code) -> Result<()> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO codes (code) VALUES (?1)",
                [code.as_str()],
            )?;
            if inserted == 0 {
                return Err(StoreError::DuplicateKey(code.clone()));
            }
            Ok(())
        })
    }

    fn append_message(&self, code: &Code, message: NewMessage) -> Result<Message> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !query_code_exists(&tx, code)? {
                return Err(StoreError::UnknownCode(code.clone()));
            }

            let message = message.stamped();
            tx.execute(
                "INSERT INTO messages (code, message, sensitivity, delivery, timestamp_utc)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    code.as_str(),
                    &message.message,
                    &message.sensitivity,
                    &message.delivery,
                    format_timestamp(&message.timestamp_utc),
                ],
            )?;
            tx.commit()?;
            Ok(message)
        })
    }

    fn list_all_grouped(&self) -> Result<Vec<CodeGroup>> {
        let rows = self.with_conn(query_all_messages)?;

        let mut groups: Vec<CodeGroup> = Vec::new();
        for row in rows {
            let (code, message) = row.into_message()?;
            match groups.last_mut() {
                Some(group) if group.code == code => group.messages.push(message),
                _ => groups.push(CodeGroup {
                    code,
                    messages: vec![message],
                }),
            }
        }
        Ok(groups)
    }
}

fn query_code_exists(conn: &Connection, code: &Code) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM codes WHERE code = ?1",
            [code.as_str()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn query_all_messages(conn: &Connection) -> Result<Vec<MessageRow>> {
    // id DESC breaks ties between messages stamped in the same microsecond
    let mut stmt = conn.prepare(
        "SELECT code, message, sensitivity, delivery, timestamp_utc
         FROM messages
         ORDER BY code ASC, timestamp_utc DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MessageRow {
                code: row.get(0)?,
                message: row.get(1)?,
                sensitivity: row.get(2)?,
                delivery: row.get(3)?,
                timestamp_utc: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
