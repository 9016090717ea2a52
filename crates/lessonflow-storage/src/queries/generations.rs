// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompts and user-requested generations.

use lessonflow_core::{GenerationStatus, LessonflowError};
use rusqlite::params;
use rusqlite::types::Value;
use sha2::{Digest, Sha256};

use crate::database::{Database, map_tr_err};
use crate::models::{Generation, Prompt, json_col, opt_json_col, status_col};
use crate::queries::status::advance_setting;

const GENERATION_COLUMNS: &str = "id, app_id, prompt_id, user_id, status, prompt_inputs,
     prompt_inputs_hash, response, error, moderation_type, moderation_meta";

fn row_to_generation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Generation> {
    Ok(Generation {
        id: row.get(0)?,
        app_id: row.get(1)?,
        prompt_id: row.get(2)?,
        user_id: row.get(3)?,
        status: status_col(row, 4)?,
        prompt_inputs: json_col(row, 5)?,
        prompt_inputs_hash: row.get(6)?,
        response: opt_json_col(row, 7)?,
        error: row.get(8)?,
        moderation_type: row.get(9)?,
        moderation_meta: opt_json_col(row, 10)?,
    })
}

/// Stable hash of prompt inputs, used to find reusable generations.
///
/// `serde_json` maps are ordered, so equal inputs serialize identically.
pub fn prompt_inputs_hash(prompt_id: &str, inputs: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(inputs.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn insert_prompt(db: &Database, prompt: &Prompt) -> Result<(), LessonflowError> {
    let prompt = prompt.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO prompts (id, app_id, slug, template) VALUES (?1, ?2, ?3, ?4)",
                params![prompt.id, prompt.app_id, prompt.slug, prompt.template],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_prompt(db: &Database, id: &str) -> Result<Option<Prompt>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT id, app_id, slug, template FROM prompts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Prompt {
                        id: row.get(0)?,
                        app_id: row.get(1)?,
                        slug: row.get(2)?,
                        template: row.get(3)?,
                    })
                },
            ) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record a REQUESTED generation. Returns its id.
pub async fn insert_generation(
    db: &Database,
    app_id: &str,
    prompt_id: &str,
    user_id: &str,
    prompt_inputs: &serde_json::Value,
) -> Result<String, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let returned = id.clone();
    let app_id = app_id.to_string();
    let prompt_id = prompt_id.to_string();
    let user_id = user_id.to_string();
    let inputs = serde_json::to_string(prompt_inputs)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO generations (id, app_id, prompt_id, user_id, prompt_inputs)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, app_id, prompt_id, user_id, inputs],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(returned)
}

pub async fn get_generation(db: &Database, id: &str) -> Result<Option<Generation>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!("SELECT {GENERATION_COLUMNS} FROM generations WHERE id = ?1"),
                params![id],
                row_to_generation,
            ) {
                Ok(g) => Ok(Some(g)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Move a REQUESTED generation to PENDING and record its inputs hash.
pub async fn start_generation(db: &Database, id: &str, hash: &str) -> Result<(), LessonflowError> {
    advance_setting(
        db,
        id,
        GenerationStatus::Pending,
        vec![("prompt_inputs_hash", Value::Text(hash.to_string()))],
    )
    .await?;
    Ok(())
}

/// Store moderation results on a generation that was not flagged.
pub async fn save_moderation_meta(
    db: &Database,
    id: &str,
    meta: &serde_json::Value,
) -> Result<(), LessonflowError> {
    let id = id.to_string();
    let meta = serde_json::to_string(meta)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE generations SET moderation_meta = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![meta, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// A successful response from another generation with the same prompt and inputs.
pub async fn find_reusable_response(
    db: &Database,
    prompt_id: &str,
    hash: &str,
    exclude_id: &str,
) -> Result<Option<serde_json::Value>, LessonflowError> {
    let prompt_id = prompt_id.to_string();
    let hash = hash.to_string();
    let exclude_id = exclude_id.to_string();
    let raw: Option<String> = db
        .connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT response FROM generations
                 WHERE prompt_id = ?1 AND prompt_inputs_hash = ?2 AND id != ?3
                   AND status = 'SUCCESS' AND response IS NOT NULL
                 ORDER BY updated_at DESC LIMIT 1",
                params![prompt_id, hash, exclude_id],
                |row| row.get(0),
            ) {
                Ok(r) => Ok(Some(r)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|r| serde_json::from_str(&r).map_err(LessonflowError::from))
        .transpose()
}

/// SUCCESS with the model's response.
pub async fn complete_generation(
    db: &Database,
    id: &str,
    response: &serde_json::Value,
) -> Result<(), LessonflowError> {
    let json = serde_json::to_string(response)?;
    advance_setting(
        db,
        id,
        GenerationStatus::Success,
        vec![("response", Value::Text(json))],
    )
    .await?;
    Ok(())
}

/// FAILED with a user-facing message.
pub async fn fail_generation(db: &Database, id: &str, message: &str) -> Result<(), LessonflowError> {
    advance_setting(
        db,
        id,
        GenerationStatus::Failed,
        vec![("error", Value::Text(message.to_string()))],
    )
    .await?;
    Ok(())
}

/// FLAGGED by moderation or model refusal.
pub async fn flag_generation(
    db: &Database,
    id: &str,
    message: &str,
    moderation_type: &str,
    moderation_meta: Option<&serde_json::Value>,
) -> Result<(), LessonflowError> {
    let mut columns = vec![
        ("error", Value::Text(message.to_string())),
        ("moderation_type", Value::Text(moderation_type.to_string())),
    ];
    if let Some(meta) = moderation_meta {
        columns.push(("moderation_meta", Value::Text(serde_json::to_string(meta)?)));
    }
    advance_setting(db, id, GenerationStatus::Flagged, columns).await?;
    Ok(())
}
