use sqlx::{Connection, Executor, PgConnection};
use tracing::info;
use vinyl_config::{IntoConnectOptions, NORMALIZE_OPTIONS, PgConnectionConfig};

use crate::error::EtlResult;

/// Idempotent DDL for the normalized star schema.
///
/// Every statement is guarded with `IF NOT EXISTS` so that a re-run after a
/// partial failure picks up where the database left off. The schema name is
/// caller configuration, never record data.
fn create_schema_sql(schema: &str) -> Vec<String> {
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {schema}"),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.artist (\
             artist_id   BIGINT GENERATED BY DEFAULT AS IDENTITY, \
             artist_name TEXT NOT NULL, \
             CONSTRAINT pk_artist PRIMARY KEY (artist_id), \
             CONSTRAINT uk_artist_name UNIQUE (artist_name))"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.album (\
             album_id     BIGINT GENERATED BY DEFAULT AS IDENTITY, \
             album_name   TEXT NOT NULL, \
             artist_id    BIGINT NOT NULL, \
             release_year INT, \
             CONSTRAINT pk_album PRIMARY KEY (album_id), \
             CONSTRAINT fk_album_artist_id FOREIGN KEY (artist_id) \
                 REFERENCES {schema}.artist (artist_id), \
             CONSTRAINT ck_album_release_year CHECK (release_year BETWEEN 1900 AND 2050), \
             CONSTRAINT uk_album_artist UNIQUE (album_name, artist_id))"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.track (\
             track_id     BIGINT GENERATED BY DEFAULT AS IDENTITY, \
             track_name   TEXT NOT NULL, \
             length       BIGINT NOT NULL, \
             album_id     BIGINT NOT NULL, \
             artist_id    BIGINT NOT NULL, \
             play_count   INT NOT NULL, \
             last_played  TIMESTAMP, \
             date_added   TIMESTAMP NOT NULL, \
             track_number TEXT NOT NULL, \
             itunes_id    VARCHAR(16) NOT NULL, \
             CONSTRAINT pk_track PRIMARY KEY (track_id), \
             CONSTRAINT fk_track_artist_id FOREIGN KEY (artist_id) \
                 REFERENCES {schema}.artist (artist_id), \
             CONSTRAINT fk_track_album_id FOREIGN KEY (album_id) \
                 REFERENCES {schema}.album (album_id), \
             CONSTRAINT ck_track_date_added CHECK (date_added <= current_timestamp :: TIMESTAMP), \
             CONSTRAINT ck_track_play_count CHECK (play_count >= 0), \
             CONSTRAINT uk_track_artist_album UNIQUE (track_name, album_id, artist_id, track_number), \
             CONSTRAINT uk_track_itunes_id UNIQUE (itunes_id))"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.play (\
             play_id   BIGINT GENERATED BY DEFAULT AS IDENTITY, \
             track_id  BIGINT, \
             played_at TIMESTAMP NOT NULL, \
             CONSTRAINT pk_play PRIMARY KEY (play_id), \
             CONSTRAINT fk_play_track_id FOREIGN KEY (track_id) \
                 REFERENCES {schema}.track (track_id), \
             CONSTRAINT uk_play_track_play_at UNIQUE (track_id, played_at))"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_track_itunes_id ON {schema}.track (itunes_id)"
        ),
    ]
}

/// The four set-based transformation passes, in dependency order.
///
/// Each pass is idempotent with respect to already-existing rows: artists
/// and albums no-op on conflict, tracks upsert on their natural key, plays
/// insert only when the exact (track, timestamp) pair is absent.
fn normalize_sql(schema: &str) -> Vec<String> {
    vec![
        format!(
            "INSERT INTO {schema}.artist (artist_name) \
             SELECT artist \
               FROM itunes.itunes \
              WHERE artist IS NOT NULL \
              GROUP BY artist \
                 ON CONFLICT (artist_name) \
                 DO NOTHING"
        ),
        format!(
            "INSERT INTO {schema}.album (album_name, artist_id, release_year) \
             SELECT album, \
                    (SELECT artist_id \
                       FROM {schema}.artist \
                      WHERE artist_name = artist), \
                    MAX(year :: INT) \
               FROM itunes.itunes \
              WHERE album IS NOT NULL \
                AND year IS NOT NULL \
              GROUP BY album, artist \
                 ON CONFLICT (album_name, artist_id) \
                 DO NOTHING"
        ),
        // The album join requires an exact release-year match; staged rows
        // whose year disagrees with the year chosen for their album fall out
        // of the join and never reach the track table.
        format!(
            "INSERT INTO {schema}.track (track_name, length, album_id, \
                                artist_id, play_count, last_played, \
                                date_added, track_number, itunes_id) \
             SELECT name, \
                    total_time :: BIGINT, \
                    al.album_id, \
                    ar.artist_id, \
                    COALESCE(play_count :: INT, 0), \
                    play_date_utc :: TIMESTAMP, \
                    date_added :: TIMESTAMP, \
                    COALESCE(track_number :: INT, 1) :: TEXT, \
                    persistent_id \
               FROM itunes.itunes t \
                    JOIN {schema}.artist ar \
                         ON (artist_name = artist) \
                    JOIN {schema}.album al \
                         ON (album_name = album \
                        AND release_year = year :: INT \
                        AND al.artist_id = ar.artist_id) \
                 ON CONFLICT \
                 ON CONSTRAINT uk_track_artist_album \
                 DO UPDATE \
                SET play_count = EXCLUDED.play_count, \
                    last_played = EXCLUDED.last_played, \
                    itunes_id = EXCLUDED.itunes_id"
        ),
        format!(
            "INSERT INTO {schema}.play (track_id, played_at) \
             SELECT t.track_id, \
                    t.last_played \
               FROM {schema}.track t \
              WHERE t.last_played IS NOT NULL \
                AND NOT EXISTS (SELECT \
                                  FROM {schema}.play p \
                                 WHERE p.track_id = t.track_id \
                                   AND p.played_at = t.last_played)"
        ),
    ]
}

/// Creates the normalized schema if it does not already exist.
pub async fn create_schema(config: &PgConnectionConfig, schema: &str) -> EtlResult<()> {
    let mut conn = PgConnection::connect_with(&config.with_db(Some(&NORMALIZE_OPTIONS))).await?;

    for statement in create_schema_sql(schema) {
        conn.execute(&*statement).await?;
    }

    info!(schema, "normalized tables ready");

    conn.close().await?;

    Ok(())
}

/// Folds staged data into the normalized tables.
pub async fn normalize(config: &PgConnectionConfig, schema: &str) -> EtlResult<()> {
    let mut conn = PgConnection::connect_with(&config.with_db(Some(&NORMALIZE_OPTIONS))).await?;

    for statement in normalize_sql(schema) {
        conn.execute(&*statement).await?;
    }

    info!(schema, "staged data migrated into normalized tables");

    conn.close().await?;

    Ok(())
}
