//! SQL statements for the show catalog.
//!
//! Every function takes a `&mut PgConnection` so the same code runs against a
//! pooled connection and inside an open transaction. Ordering is always
//! explicit; Postgres gives no row order otherwise.

use showgrid_core::{
    EventKind, EventRecord, EventSelector, Include, ListQuery, NewEvent, NewShow, ShowFilter,
    ShowOrder, ShowPatch, ShowRecord, StoreError,
};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::classify;

#[derive(sqlx::FromRow)]
struct ShowRow {
    id: String,
    title: String,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    show_id: Option<String>,
    kind: String,
}

impl ShowRow {
    fn into_record(self, events: Option<Vec<EventRecord>>) -> ShowRecord {
        ShowRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            events,
        }
    }
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord, StoreError> {
        let kind = EventKind::parse(&self.kind).map_err(|e| StoreError::Data(e.to_string()))?;
        Ok(EventRecord {
            id: self.id,
            show_id: self.show_id,
            kind,
            show: None,
        })
    }
}

async fn events_owned_by(
    conn: &mut PgConnection,
    show_id: &str,
) -> Result<Vec<EventRecord>, StoreError> {
    let rows: Vec<EventRow> = sqlx::query_as(
        r"
        SELECT id, show_id, kind
        FROM events
        WHERE show_id = $1
        ORDER BY id ASC
        ",
    )
    .bind(show_id)
    .fetch_all(conn)
    .await
    .map_err(classify)?;

    rows.into_iter().map(EventRow::into_record).collect()
}

async fn load_relations(
    conn: &mut PgConnection,
    row: ShowRow,
    include: Include,
) -> Result<ShowRecord, StoreError> {
    let events = if include.events {
        Some(events_owned_by(conn, &row.id).await?)
    } else {
        None
    };
    Ok(row.into_record(events))
}

pub(crate) async fn count_shows(
    conn: &mut PgConnection,
    filter: Option<&ShowFilter>,
) -> Result<u64, StoreError> {
    let title = filter.and_then(|f| f.title.as_deref());
    let (count,): (i64,) = sqlx::query_as(
        r"
        SELECT COUNT(*)
        FROM shows
        WHERE ($1::text IS NULL OR title = $1)
        ",
    )
    .bind(title)
    .fetch_one(conn)
    .await
    .map_err(classify)?;

    Ok(u64::try_from(count).unwrap_or(0))
}

pub(crate) async fn find_shows(
    conn: &mut PgConnection,
    query: &ListQuery,
) -> Result<Vec<ShowRecord>, StoreError> {
    let order = match query.order {
        Some(ShowOrder::TitleAsc) => "title ASC, id ASC",
        Some(ShowOrder::TitleDesc) => "title DESC, id ASC",
        None => "id ASC",
    };
    let sql = format!(
        r"
        SELECT id, title, description
        FROM shows
        WHERE ($1::text IS NULL OR title = $1)
        ORDER BY {order}
        LIMIT $2 OFFSET $3
        "
    );

    let title = query.filter.as_ref().and_then(|f| f.title.as_deref());
    let rows: Vec<ShowRow> = sqlx::query_as(&sql)
        .bind(title)
        .bind(query.limit.and_then(|l| i64::try_from(l).ok()))
        .bind(query.offset.and_then(|o| i64::try_from(o).ok()).unwrap_or(0))
        .fetch_all(&mut *conn)
        .await
        .map_err(classify)?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(load_relations(conn, row, query.include).await?);
    }
    Ok(records)
}

pub(crate) async fn find_show(
    conn: &mut PgConnection,
    id: &str,
    include: Include,
) -> Result<Option<ShowRecord>, StoreError> {
    let row: Option<ShowRow> = sqlx::query_as(
        r"
        SELECT id, title, description
        FROM shows
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(classify)?;

    match row {
        Some(row) => Ok(Some(load_relations(conn, row, include).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn create_show(
    conn: &mut PgConnection,
    data: NewShow,
    include: Include,
) -> Result<ShowRecord, StoreError> {
    let id = data.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let row: ShowRow = sqlx::query_as(
        r"
        INSERT INTO shows (id, title, description)
        VALUES ($1, $2, $3)
        RETURNING id, title, description
        ",
    )
    .bind(&id)
    .bind(&data.title)
    .bind(&data.description)
    .fetch_one(&mut *conn)
    .await
    .map_err(classify)?;

    load_relations(conn, row, include).await
}

pub(crate) async fn update_show(
    conn: &mut PgConnection,
    id: &str,
    patch: ShowPatch,
    include: Include,
) -> Result<Option<ShowRecord>, StoreError> {
    let row: Option<ShowRow> = sqlx::query_as(
        r"
        UPDATE shows
        SET id = COALESCE($2, id),
            title = COALESCE($3, title),
            description = COALESCE($4, description)
        WHERE id = $1
        RETURNING id, title, description
        ",
    )
    .bind(id)
    .bind(&patch.id)
    .bind(&patch.title)
    .bind(&patch.description)
    .fetch_optional(&mut *conn)
    .await
    .map_err(classify)?;

    match row {
        Some(row) => Ok(Some(load_relations(conn, row, include).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn delete_show(
    conn: &mut PgConnection,
    id: &str,
    include: Include,
) -> Result<Option<ShowRecord>, StoreError> {
    // Read first so the returned record can carry the events relation as it
    // stood before the row disappeared.
    let Some(record) = find_show(&mut *conn, id, include).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM shows WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .map_err(classify)?;

    Ok(Some(record))
}

pub(crate) async fn find_events(
    conn: &mut PgConnection,
    selector: &EventSelector,
) -> Result<Vec<EventRecord>, StoreError> {
    let rows: Vec<EventRow> = match selector {
        EventSelector::OwnedBy(show_id) => {
            return events_owned_by(conn, show_id).await;
        }
        EventSelector::Ids(ids) => sqlx::query_as(
            r"
            SELECT id, show_id, kind
            FROM events
            WHERE id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
        .map_err(classify)?,
    };

    rows.into_iter().map(EventRow::into_record).collect()
}

pub(crate) async fn create_events(
    conn: &mut PgConnection,
    rows: Vec<NewEvent>,
) -> Result<u64, StoreError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut ids = Vec::with_capacity(rows.len());
    let mut show_ids = Vec::with_capacity(rows.len());
    let mut kinds = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(row.id);
        show_ids.push(row.show_id);
        kinds.push(row.kind.as_str().to_string());
    }

    let result = sqlx::query(
        r"
        INSERT INTO events (id, show_id, kind)
        SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[])
        ",
    )
    .bind(&ids)
    .bind(&show_ids)
    .bind(&kinds)
    .execute(conn)
    .await
    .map_err(classify)?;

    Ok(result.rows_affected())
}

pub(crate) async fn delete_events(
    conn: &mut PgConnection,
    ids: &[String],
) -> Result<u64, StoreError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM events WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await
        .map_err(classify)?;

    Ok(result.rows_affected())
}
