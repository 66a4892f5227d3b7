//! SQLite-backed stack repository.
//!
//! # Responsibility
//! - Persist stacks across `stacks` and its positional child tables.
//! - Express ACL/tag search as SQL `EXISTS` filters with stable ordering.
//!
//! # Invariants
//! - Every write runs inside one `IMMEDIATE` transaction, including its
//!   uniqueness checks.
//! - Reads load the row and all children inside one transaction.
//! - Child rows keep caller list order through their `position` column.
//! - Read paths reject undecodable persisted state instead of masking it.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::stack::{
    validate_stack_id, AclEntry, Stack, StackComponent, StackIcon, StackSource, WorkspaceConfig,
    SEARCH_ACTION,
};
use crate::repo::stack_repo::{RepoError, RepoResult, StackRepository, UniqueField};
use crate::search::filter::StackSearchQuery;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const STACK_SELECT_SQL: &str = "SELECT
    id,
    name,
    creator,
    description,
    scope,
    source_type,
    source_origin,
    icon_name,
    icon_media_type,
    icon_data,
    workspace_config
FROM stacks";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "stacks",
        &[
            "id",
            "name",
            "creator",
            "description",
            "scope",
            "source_type",
            "source_origin",
            "icon_name",
            "icon_media_type",
            "icon_data",
            "workspace_config",
        ],
    ),
    ("stack_tags", &["stack_id", "position", "tag"]),
    (
        "stack_components",
        &["stack_id", "position", "name", "version"],
    ),
    ("stack_acl", &["stack_id", "position", "user_id"]),
    (
        "stack_acl_actions",
        &["stack_id", "entry_position", "position", "action"],
    ),
    ("stack_public_actions", &["stack_id", "position", "action"]),
];

/// SQLite-backed stack repository.
///
/// Owns one connection and serializes its use. Several repositories may
/// point at the same database file; SQLite transactions keep them consistent.
pub struct SqliteStackRepository {
    conn: Mutex<Connection>,
}

impl SqliteStackRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the connection
    ///   was not opened through `db::open_db*`.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_stack_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl StackRepository for SqliteStackRepository {
    fn get_by_id(&self, id: &str) -> RepoResult<Stack> {
        validate_stack_id(id)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let stack = load_stack(&tx, id)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        tx.commit()?;
        Ok(stack)
    }

    fn create(&self, stack: &Stack) -> RepoResult<()> {
        stack.validate()?;
        let workspace_config = encode_workspace_config(&stack.workspace_config)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if stack_exists(&tx, &stack.id)? {
            return Err(RepoError::already_exists(UniqueField::Id, &stack.id));
        }
        if find_id_by_name(&tx, &stack.name)?.is_some() {
            return Err(RepoError::already_exists(UniqueField::Name, &stack.name));
        }

        let (icon_name, icon_media_type, icon_data) = icon_columns(stack.icon.as_ref());
        tx.execute(
            "INSERT INTO stacks (
                id,
                name,
                creator,
                description,
                scope,
                source_type,
                source_origin,
                icon_name,
                icon_media_type,
                icon_data,
                workspace_config
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                stack.id.as_str(),
                stack.name.as_str(),
                stack.creator.as_str(),
                stack.description.as_str(),
                stack.scope.as_str(),
                stack.source.kind.as_str(),
                stack.source.origin.as_str(),
                icon_name,
                icon_media_type,
                icon_data,
                workspace_config,
            ],
        )
        .map_err(|err| map_write_error(err, stack))?;
        insert_children(&tx, stack)?;

        tx.commit()?;
        Ok(())
    }

    fn update(&self, stack: &Stack) -> RepoResult<()> {
        stack.validate()?;
        let workspace_config = encode_workspace_config(&stack.workspace_config)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !stack_exists(&tx, &stack.id)? {
            return Err(RepoError::NotFound(stack.id.clone()));
        }
        if let Some(owner) = find_id_by_name(&tx, &stack.name)? {
            if owner != stack.id {
                return Err(RepoError::already_exists(UniqueField::Name, &stack.name));
            }
        }

        let (icon_name, icon_media_type, icon_data) = icon_columns(stack.icon.as_ref());
        tx.execute(
            "UPDATE stacks
             SET
                name = ?2,
                creator = ?3,
                description = ?4,
                scope = ?5,
                source_type = ?6,
                source_origin = ?7,
                icon_name = ?8,
                icon_media_type = ?9,
                icon_data = ?10,
                workspace_config = ?11
             WHERE id = ?1;",
            params![
                stack.id.as_str(),
                stack.name.as_str(),
                stack.creator.as_str(),
                stack.description.as_str(),
                stack.scope.as_str(),
                stack.source.kind.as_str(),
                stack.source.origin.as_str(),
                icon_name,
                icon_media_type,
                icon_data,
                workspace_config,
            ],
        )
        .map_err(|err| map_write_error(err, stack))?;
        delete_children(&tx, &stack.id)?;
        insert_children(&tx, stack)?;

        tx.commit()?;
        Ok(())
    }

    fn remove(&self, id: &str) -> RepoResult<()> {
        validate_stack_id(id)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        delete_children(&tx, id)?;
        tx.execute("DELETE FROM stacks WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(())
    }

    fn search_stacks(&self, query: &StackSearchQuery) -> RepoResult<Vec<Stack>> {
        let mut sql = String::from(
            "SELECT id
             FROM stacks
             WHERE (EXISTS (
                    SELECT 1
                    FROM stack_public_actions pa
                    WHERE pa.stack_id = stacks.id
                      AND pa.action = ?
                )",
        );
        let mut bind_values: Vec<Value> = vec![Value::Text(SEARCH_ACTION.to_string())];

        if let Some(user_id) = query.user_id.as_ref() {
            sql.push_str(
                " OR EXISTS (
                    SELECT 1
                    FROM stack_acl acl
                    INNER JOIN stack_acl_actions aa
                        ON aa.stack_id = acl.stack_id
                       AND aa.entry_position = acl.position
                    WHERE acl.stack_id = stacks.id
                      AND acl.user_id = ?
                      AND aa.action = ?
                )",
            );
            bind_values.push(Value::Text(user_id.clone()));
            bind_values.push(Value::Text(SEARCH_ACTION.to_string()));
        }
        sql.push(')');

        for tag in &query.tags {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM stack_tags st
                    WHERE st.stack_id = stacks.id
                      AND st.tag = ?
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY id ASC");
        if query.limit > 0 {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(query.limit)));
            if query.skip > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.skip)));
            }
        } else if query.skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.skip)));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let ids = {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get::<_, String>("id")?);
            }
            ids
        };

        let mut stacks = Vec::with_capacity(ids.len());
        for id in ids {
            let stack = load_stack(&tx, &id)?.ok_or_else(|| {
                RepoError::InvalidData(format!("stack `{id}` vanished during search"))
            })?;
            stacks.push(stack);
        }
        tx.commit()?;

        Ok(stacks)
    }
}

fn load_stack(conn: &Connection, id: &str) -> RepoResult<Option<Stack>> {
    let mut stmt = conn.prepare(&format!("{STACK_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut stack = parse_stack_row(row)?;
    stack.tags = load_strings(
        conn,
        "SELECT tag FROM stack_tags WHERE stack_id = ?1 ORDER BY position ASC;",
        id,
    )?;
    stack.components = load_components(conn, id)?;
    stack.acl = load_acl(conn, id)?;
    stack.public_actions = load_strings(
        conn,
        "SELECT action FROM stack_public_actions WHERE stack_id = ?1 ORDER BY position ASC;",
        id,
    )?;

    stack.validate().map_err(|err| {
        RepoError::InvalidData(format!("stack `{id}` fails validation: {err}"))
    })?;
    Ok(Some(stack))
}

fn parse_stack_row(row: &Row<'_>) -> RepoResult<Stack> {
    let id: String = row.get("id")?;

    let icon = match (
        row.get::<_, Option<String>>("icon_name")?,
        row.get::<_, Option<String>>("icon_media_type")?,
        row.get::<_, Option<Vec<u8>>>("icon_data")?,
    ) {
        (Some(name), Some(media_type), Some(data)) => Some(StackIcon {
            name,
            media_type,
            data,
        }),
        (None, None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "partial icon columns for stack `{id}`"
            )));
        }
    };

    let config_text: String = row.get("workspace_config")?;
    let workspace_config = serde_json::from_str::<WorkspaceConfig>(&config_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid workspace config json for stack `{id}`: {err}"
        ))
    })?;

    Ok(Stack {
        name: row.get("name")?,
        creator: row.get("creator")?,
        description: row.get("description")?,
        scope: row.get("scope")?,
        tags: Vec::new(),
        components: Vec::new(),
        source: StackSource {
            kind: row.get("source_type")?,
            origin: row.get("source_origin")?,
        },
        icon,
        acl: Vec::new(),
        public_actions: Vec::new(),
        workspace_config,
        id,
    })
}

fn load_strings(conn: &Connection, sql: &str, stack_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([stack_id])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

fn load_components(conn: &Connection, stack_id: &str) -> RepoResult<Vec<StackComponent>> {
    let mut stmt = conn.prepare(
        "SELECT name, version
         FROM stack_components
         WHERE stack_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([stack_id])?;
    let mut components = Vec::new();
    while let Some(row) = rows.next()? {
        components.push(StackComponent {
            name: row.get("name")?,
            version: row.get("version")?,
        });
    }
    Ok(components)
}

fn load_acl(conn: &Connection, stack_id: &str) -> RepoResult<Vec<AclEntry>> {
    let mut entries_stmt = conn.prepare(
        "SELECT position, user_id
         FROM stack_acl
         WHERE stack_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut actions_stmt = conn.prepare(
        "SELECT action
         FROM stack_acl_actions
         WHERE stack_id = ?1 AND entry_position = ?2
         ORDER BY position ASC;",
    )?;

    let mut rows = entries_stmt.query([stack_id])?;
    let mut acl = Vec::new();
    while let Some(row) = rows.next()? {
        let position: i64 = row.get("position")?;
        let mut action_rows = actions_stmt.query(params![stack_id, position])?;
        let mut actions = Vec::new();
        while let Some(action_row) = action_rows.next()? {
            actions.push(action_row.get(0)?);
        }
        acl.push(AclEntry {
            user: row.get("user_id")?,
            actions,
        });
    }
    Ok(acl)
}

fn insert_children(conn: &Connection, stack: &Stack) -> RepoResult<()> {
    let id = stack.id.as_str();

    for (position, tag) in stack.tags.iter().enumerate() {
        conn.execute(
            "INSERT INTO stack_tags (stack_id, position, tag) VALUES (?1, ?2, ?3);",
            params![id, position as i64, tag.as_str()],
        )?;
    }

    for (position, component) in stack.components.iter().enumerate() {
        conn.execute(
            "INSERT INTO stack_components (stack_id, position, name, version)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id,
                position as i64,
                component.name.as_str(),
                component.version.as_str()
            ],
        )?;
    }

    for (entry_position, entry) in stack.acl.iter().enumerate() {
        conn.execute(
            "INSERT INTO stack_acl (stack_id, position, user_id) VALUES (?1, ?2, ?3);",
            params![id, entry_position as i64, entry.user.as_str()],
        )?;
        for (position, action) in entry.actions.iter().enumerate() {
            conn.execute(
                "INSERT INTO stack_acl_actions (stack_id, entry_position, position, action)
                 VALUES (?1, ?2, ?3, ?4);",
                params![id, entry_position as i64, position as i64, action.as_str()],
            )?;
        }
    }

    for (position, action) in stack.public_actions.iter().enumerate() {
        conn.execute(
            "INSERT INTO stack_public_actions (stack_id, position, action) VALUES (?1, ?2, ?3);",
            params![id, position as i64, action.as_str()],
        )?;
    }

    Ok(())
}

fn delete_children(conn: &Connection, stack_id: &str) -> RepoResult<()> {
    // Actions reference acl rows, so they go first.
    for table in [
        "stack_acl_actions",
        "stack_acl",
        "stack_tags",
        "stack_components",
        "stack_public_actions",
    ] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE stack_id = ?1;"),
            [stack_id],
        )?;
    }
    Ok(())
}

fn stack_exists(conn: &Connection, stack_id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM stacks WHERE id = ?1);",
        [stack_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn find_id_by_name(conn: &Connection, name: &str) -> RepoResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT id FROM stacks WHERE name = ?1;")?;
    let mut rows = stmt.query([name])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

fn icon_columns(icon: Option<&StackIcon>) -> (Option<&str>, Option<&str>, Option<&[u8]>) {
    match icon {
        Some(icon) => (
            Some(icon.name.as_str()),
            Some(icon.media_type.as_str()),
            Some(icon.data.as_slice()),
        ),
        None => (None, None, None),
    }
}

fn encode_workspace_config(config: &WorkspaceConfig) -> RepoResult<String> {
    serde_json::to_string(config)
        .map_err(|err| RepoError::InvalidData(format!("workspace config is not encodable: {err}")))
}

/// Maps constraint violations that slipped past the explicit checks.
fn map_write_error(err: rusqlite::Error, stack: &Stack) -> RepoError {
    let err = DbError::Sqlite(err);
    if !err.is_unique_violation() {
        return RepoError::Db(err);
    }
    if err.to_string().contains("stacks.name") {
        RepoError::already_exists(UniqueField::Name, &stack.name)
    } else {
        RepoError::already_exists(UniqueField::Id, &stack.id)
    }
}

fn ensure_stack_connection_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
