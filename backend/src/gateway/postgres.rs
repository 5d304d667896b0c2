use std::collections::HashMap;

use common::match_analysis::{Event, FormationSnapshot, Player, PlayerStats, TeamStats};
use common::{DashboardStats, Game, GameStatus, Job, Stage};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use super::{Gateway, GatewayError, JobUpdate, NewGame};
use crate::models::{
    EventRow, FormationPlayerRow, FormationRow, GameRow, JobRow, PlayerRow, PlayerStatsRow,
    TeamStatsRow,
};
use crate::schema::{
    events, formation_players, formations, games, player_stats, players, processing_jobs,
    team_stats,
};

/// Stores every record in PostgreSQL, opening a connection per operation.
#[derive(Debug, Clone)]
pub struct PgGateway {
    database_url: String,
}

impl PgGateway {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    pub async fn connection(&self) -> Result<AsyncPgConnection, GatewayError> {
        AsyncPgConnection::establish(&self.database_url)
            .await
            .map_err(GatewayError::from)
    }
}

fn terminal_stages() -> Vec<&'static str> {
    Stage::ALL
        .iter()
        .filter(|s| s.is_terminal())
        .map(|s| s.as_str())
        .collect()
}

async fn locked_game(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Game, GatewayError> {
    let row: GameRow = games::table
        .find(id)
        .select(GameRow::as_select())
        .for_update()
        .get_result(conn)
        .await
        .optional()?
        .ok_or(GatewayError::NotFound("game"))?;

    Ok(Game::try_from(row)?)
}

async fn locked_job(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Job, GatewayError> {
    let row: JobRow = processing_jobs::table
        .find(id)
        .select(JobRow::as_select())
        .for_update()
        .get_result(conn)
        .await
        .optional()?
        .ok_or(GatewayError::NotFound("job"))?;

    Ok(Job::try_from(row)?)
}

/// Writes an already checked update. Callers hold the row lock.
async fn write_job(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    update: JobUpdate,
) -> Result<Job, GatewayError> {
    let query = diesel::dsl::update(processing_jobs::table.find(id))
        .set((
            processing_jobs::stage.eq(update.stage.as_str()),
            processing_jobs::progress.eq(i16::from(update.progress)),
            processing_jobs::message.eq(update.message),
            processing_jobs::error_message.eq(update.error_message),
            processing_jobs::updated_at.eq(chrono::Utc::now()),
        ))
        .returning(JobRow::as_returning());
    tracing::trace!(?query, "Update job query");

    let row = query.get_result(conn).await?;
    Ok(Job::try_from(row)?)
}

#[async_trait::async_trait]
impl Gateway for PgGateway {
    async fn create_game(&self, game: NewGame) -> Result<Game, GatewayError> {
        let mut db_con = self.connection().await?;

        let row = GameRow {
            id: Uuid::now_v7(),
            home_team: game.home_team,
            away_team: game.away_team,
            date: game.date,
            duration: i32::try_from(game.duration).unwrap_or(i32::MAX),
            status: GameStatus::Uploaded.as_str().to_owned(),
            video_file: None,
            video_url: game.video_url,
            user_id: game.owner,
            created_at: chrono::Utc::now(),
            processed_at: None,
        };

        let query = diesel::dsl::insert_into(games::table)
            .values(row)
            .returning(GameRow::as_returning());
        tracing::trace!(?query, "Insert game query");

        let row = query.get_result(&mut db_con).await?;
        Ok(Game::try_from(row)?)
    }

    async fn game(&self, id: Uuid) -> Result<Game, GatewayError> {
        let mut db_con = self.connection().await?;

        let row: GameRow = games::table
            .find(id)
            .select(GameRow::as_select())
            .first(&mut db_con)
            .await
            .optional()?
            .ok_or(GatewayError::NotFound("game"))?;

        Ok(Game::try_from(row)?)
    }

    async fn list_games(&self, owner: &str) -> Result<Vec<Game>, GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<GameRow> = games::table
            .filter(games::user_id.eq(owner))
            .order((games::created_at.desc(), games::id.desc()))
            .select(GameRow::as_select())
            .load(&mut db_con)
            .await?;

        rows.into_iter()
            .map(|r| Game::try_from(r).map_err(GatewayError::from))
            .collect()
    }

    async fn set_video_file(&self, id: Uuid, path: String) -> Result<(), GatewayError> {
        let mut db_con = self.connection().await?;

        let updated = diesel::dsl::update(games::table.find(id))
            .set(games::video_file.eq(path))
            .execute(&mut db_con)
            .await?;

        if updated == 0 {
            return Err(GatewayError::NotFound("game"));
        }
        Ok(())
    }

    async fn set_game_status(&self, id: Uuid, status: GameStatus) -> Result<Game, GatewayError> {
        let mut db_con = self.connection().await?;

        db_con
            .build_transaction()
            .run::<_, GatewayError, _>(|conn| {
                Box::pin(async move {
                    let game = locked_game(conn, id).await?;
                    super::check_game_status(&game)?;

                    let processed_at =
                        (status == GameStatus::Completed).then(chrono::Utc::now);

                    let row = diesel::dsl::update(games::table.find(id))
                        .set((
                            games::status.eq(status.as_str()),
                            games::processed_at.eq(processed_at.or(game.processed_at)),
                        ))
                        .returning(GameRow::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok(Game::try_from(row)?)
                })
            })
            .await
    }

    async fn create_job(&self, game_id: Uuid, owner: &str) -> Result<Job, GatewayError> {
        let mut db_con = self.connection().await?;
        let owner = owner.to_owned();

        db_con
            .build_transaction()
            .run::<_, GatewayError, _>(|conn| {
                Box::pin(async move {
                    // Locking the game serializes job creation per game.
                    locked_game(conn, game_id).await?;

                    let running: i64 = processing_jobs::table
                        .filter(processing_jobs::game_id.eq(game_id))
                        .filter(processing_jobs::stage.ne_all(terminal_stages()))
                        .count()
                        .get_result(conn)
                        .await?;
                    if running > 0 {
                        return Err(GatewayError::Conflict(game_id));
                    }

                    let now = chrono::Utc::now();
                    let job = Job {
                        id: Uuid::now_v7(),
                        game_id,
                        stage: Stage::Uploading,
                        progress: 0,
                        message: None,
                        error_message: None,
                        owner,
                        created_at: now,
                        updated_at: now,
                    };

                    diesel::dsl::insert_into(processing_jobs::table)
                        .values(JobRow::from(&job))
                        .execute(conn)
                        .await?;

                    Ok(job)
                })
            })
            .await
    }

    async fn latest_job(&self, game_id: Uuid) -> Result<Job, GatewayError> {
        let mut db_con = self.connection().await?;

        let row: JobRow = processing_jobs::table
            .filter(processing_jobs::game_id.eq(game_id))
            .order((processing_jobs::created_at.desc(), processing_jobs::id.desc()))
            .select(JobRow::as_select())
            .first(&mut db_con)
            .await
            .optional()?
            .ok_or(GatewayError::NotFound("job"))?;

        Ok(Job::try_from(row)?)
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, GatewayError> {
        let mut db_con = self.connection().await?;

        db_con
            .build_transaction()
            .run::<_, GatewayError, _>(|conn| {
                Box::pin(async move {
                    let current = locked_job(conn, job_id).await?;
                    super::check_job_update(&current, &update)?;

                    write_job(conn, job_id, update).await
                })
            })
            .await
    }

    async fn complete_job(&self, job_id: Uuid, message: String) -> Result<Job, GatewayError> {
        let mut db_con = self.connection().await?;
        let update = super::completion(message);

        db_con
            .build_transaction()
            .run::<_, GatewayError, _>(|conn| {
                Box::pin(async move {
                    let current = locked_job(conn, job_id).await?;
                    super::check_job_update(&current, &update)?;

                    let game = locked_game(conn, current.game_id).await?;
                    super::check_game_status(&game)?;

                    diesel::dsl::update(games::table.find(game.id))
                        .set((
                            games::status.eq(GameStatus::Completed.as_str()),
                            games::processed_at.eq(Some(chrono::Utc::now())),
                        ))
                        .execute(conn)
                        .await?;

                    write_job(conn, job_id, update).await
                })
            })
            .await
    }

    async fn insert_players(&self, players: &[Player]) -> Result<(), GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<PlayerRow> = players.iter().map(PlayerRow::from).collect();
        diesel::dsl::insert_into(players::table)
            .values(&rows)
            .execute(&mut db_con)
            .await?;

        Ok(())
    }

    async fn players(&self, game_id: Uuid) -> Result<Vec<Player>, GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<PlayerRow> = players::table
            .filter(players::game_id.eq(game_id))
            .order((players::team.asc(), players::jersey_number.asc()))
            .select(PlayerRow::as_select())
            .load(&mut db_con)
            .await?;

        rows.into_iter()
            .map(|r| Player::try_from(r).map_err(GatewayError::from))
            .collect()
    }

    async fn insert_events(&self, events: &[Event]) -> Result<(), GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
        diesel::dsl::insert_into(events::table)
            .values(&rows)
            .execute(&mut db_con)
            .await?;

        Ok(())
    }

    async fn events(&self, game_id: Uuid) -> Result<Vec<Event>, GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<EventRow> = events::table
            .filter(events::game_id.eq(game_id))
            .order((events::timestamp_seconds.asc(), events::id.asc()))
            .select(EventRow::as_select())
            .load(&mut db_con)
            .await?;

        rows.into_iter()
            .map(|r| Event::try_from(r).map_err(GatewayError::from))
            .collect()
    }

    async fn insert_formation(&self, snapshot: &FormationSnapshot) -> Result<(), GatewayError> {
        let mut db_con = self.connection().await?;
        let (header, positions) = FormationRow::split(snapshot);

        db_con
            .build_transaction()
            .run::<_, GatewayError, _>(|conn| {
                Box::pin(async move {
                    diesel::dsl::insert_into(formations::table)
                        .values(header)
                        .execute(conn)
                        .await?;

                    if !positions.is_empty() {
                        diesel::dsl::insert_into(formation_players::table)
                            .values(&positions)
                            .execute(conn)
                            .await?;
                    }

                    Ok(())
                })
            })
            .await
    }

    async fn formations(&self, game_id: Uuid) -> Result<Vec<FormationSnapshot>, GatewayError> {
        let mut db_con = self.connection().await?;

        let headers: Vec<FormationRow> = formations::table
            .filter(formations::game_id.eq(game_id))
            .order((formations::timestamp_seconds.asc(), formations::team.asc()))
            .select(FormationRow::as_select())
            .load(&mut db_con)
            .await?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let positions: Vec<FormationPlayerRow> = formation_players::table
            .filter(formation_players::formation_id.eq_any(ids))
            .order((formation_players::formation_id.asc(), formation_players::slot.asc()))
            .select(FormationPlayerRow::as_select())
            .load(&mut db_con)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<FormationPlayerRow>> = HashMap::new();
        for position in positions {
            grouped.entry(position.formation_id).or_default().push(position);
        }

        headers
            .into_iter()
            .map(|header| {
                let positions = grouped.remove(&header.id).unwrap_or_default();
                header.join(positions).map_err(GatewayError::from)
            })
            .collect()
    }

    async fn insert_stats(
        &self,
        players: &[PlayerStats],
        teams: &[TeamStats],
    ) -> Result<(), GatewayError> {
        let mut db_con = self.connection().await?;

        let player_rows: Vec<PlayerStatsRow> = players.iter().map(PlayerStatsRow::from).collect();
        let team_rows: Vec<TeamStatsRow> = teams.iter().map(TeamStatsRow::from).collect();

        db_con
            .build_transaction()
            .run::<_, GatewayError, _>(|conn| {
                Box::pin(async move {
                    if !player_rows.is_empty() {
                        diesel::dsl::insert_into(player_stats::table)
                            .values(&player_rows)
                            .execute(conn)
                            .await?;
                    }
                    if !team_rows.is_empty() {
                        diesel::dsl::insert_into(team_stats::table)
                            .values(&team_rows)
                            .execute(conn)
                            .await?;
                    }

                    Ok(())
                })
            })
            .await
    }

    async fn player_stats(&self, game_id: Uuid) -> Result<Vec<PlayerStats>, GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<PlayerStatsRow> = player_stats::table
            .filter(player_stats::game_id.eq(game_id))
            .select(PlayerStatsRow::as_select())
            .load(&mut db_con)
            .await?;

        rows.into_iter()
            .map(|r| PlayerStats::try_from(r).map_err(GatewayError::from))
            .collect()
    }

    async fn team_stats(&self, game_id: Uuid) -> Result<Vec<TeamStats>, GatewayError> {
        let mut db_con = self.connection().await?;

        let rows: Vec<TeamStatsRow> = team_stats::table
            .filter(team_stats::game_id.eq(game_id))
            .order(team_stats::team.desc())
            .select(TeamStatsRow::as_select())
            .load(&mut db_con)
            .await?;

        rows.into_iter()
            .map(|r| TeamStats::try_from(r).map_err(GatewayError::from))
            .collect()
    }

    async fn dashboard(&self, owner: &str) -> Result<DashboardStats, GatewayError> {
        let mut db_con = self.connection().await?;

        let total_games: i64 = games::table
            .filter(games::user_id.eq(owner))
            .count()
            .get_result(&mut db_con)
            .await?;

        let total_events: i64 = events::table
            .filter(events::user_id.eq(owner))
            .count()
            .get_result(&mut db_con)
            .await?;

        let completed_games: i64 = games::table
            .filter(games::user_id.eq(owner))
            .filter(games::status.eq(GameStatus::Completed.as_str()))
            .count()
            .get_result(&mut db_con)
            .await?;

        let finished: Vec<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> =
            processing_jobs::table
                .filter(processing_jobs::user_id.eq(owner))
                .filter(processing_jobs::stage.eq(Stage::Complete.as_str()))
                .order(processing_jobs::updated_at.desc())
                .limit(super::DASHBOARD_JOB_WINDOW as i64)
                .select((processing_jobs::created_at, processing_jobs::updated_at))
                .load(&mut db_con)
                .await?;

        Ok(DashboardStats {
            total_games: usize::try_from(total_games).unwrap_or_default(),
            total_events: usize::try_from(total_events).unwrap_or_default(),
            completed_games: usize::try_from(completed_games).unwrap_or_default(),
            avg_processing_minutes: super::average_processing_minutes(&finished),
        })
    }
}
