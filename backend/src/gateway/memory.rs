use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use common::match_analysis::{Event, FormationSnapshot, Player, PlayerStats, TeamStats};
use common::{DashboardStats, Game, GameStatus, Job, Stage};
use uuid::Uuid;

use super::{Gateway, GatewayError, JobUpdate, NewGame};

#[derive(Debug, Default)]
struct State {
    games: HashMap<Uuid, Game>,
    jobs: Vec<Job>,
    job_history: HashMap<Uuid, Vec<Job>>,
    players: Vec<Player>,
    events: Vec<Event>,
    formations: Vec<FormationSnapshot>,
    player_stats: Vec<PlayerStats>,
    team_stats: Vec<TeamStats>,
}

impl State {
    fn job(&self, job_id: Uuid) -> Result<&Job, GatewayError> {
        self.jobs
            .iter()
            .find(|j| j.id == job_id)
            .ok_or(GatewayError::NotFound("job"))
    }

    fn write_job(&mut self, job_id: Uuid, update: JobUpdate) -> Result<Job, GatewayError> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or(GatewayError::NotFound("job"))?;
        super::check_job_update(job, &update)?;

        job.stage = update.stage;
        job.progress = update.progress;
        job.message = update.message;
        job.error_message = update.error_message;
        job.updated_at = chrono::Utc::now();

        let job = job.clone();
        self.job_history
            .entry(job_id)
            .or_default()
            .push(job.clone());
        Ok(job)
    }
}

/// Keeps every record in process memory. Used when no database is
/// configured and as the gateway of the test suites.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking writer cannot leave a record half-written, every
        // mutation below is a single push or assignment.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every version a job went through, oldest first.
    pub fn job_history(&self, job_id: Uuid) -> Vec<Job> {
        self.state()
            .job_history
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Gateway for MemoryGateway {
    async fn create_game(&self, game: NewGame) -> Result<Game, GatewayError> {
        let game = Game {
            id: Uuid::now_v7(),
            home_team: game.home_team,
            away_team: game.away_team,
            date: game.date,
            duration: game.duration,
            status: GameStatus::Uploaded,
            video_file: None,
            video_url: game.video_url,
            owner: game.owner,
            created_at: chrono::Utc::now(),
            processed_at: None,
        };

        self.state().games.insert(game.id, game.clone());
        Ok(game)
    }

    async fn game(&self, id: Uuid) -> Result<Game, GatewayError> {
        self.state()
            .games
            .get(&id)
            .cloned()
            .ok_or(GatewayError::NotFound("game"))
    }

    async fn list_games(&self, owner: &str) -> Result<Vec<Game>, GatewayError> {
        let mut games: Vec<Game> = self
            .state()
            .games
            .values()
            .filter(|g| g.owner == owner)
            .cloned()
            .collect();
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(games)
    }

    async fn set_video_file(&self, id: Uuid, path: String) -> Result<(), GatewayError> {
        let mut state = self.state();
        let game = state
            .games
            .get_mut(&id)
            .ok_or(GatewayError::NotFound("game"))?;
        game.video_file = Some(path);
        Ok(())
    }

    async fn set_game_status(&self, id: Uuid, status: GameStatus) -> Result<Game, GatewayError> {
        let mut state = self.state();
        let game = state
            .games
            .get_mut(&id)
            .ok_or(GatewayError::NotFound("game"))?;
        super::check_game_status(game)?;

        game.status = status;
        if status == GameStatus::Completed {
            game.processed_at = Some(chrono::Utc::now());
        }
        Ok(game.clone())
    }

    async fn create_job(&self, game_id: Uuid, owner: &str) -> Result<Job, GatewayError> {
        let mut state = self.state();
        if !state.games.contains_key(&game_id) {
            return Err(GatewayError::NotFound("game"));
        }
        if state
            .jobs
            .iter()
            .any(|j| j.game_id == game_id && !j.stage.is_terminal())
        {
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
            owner: owner.to_owned(),
            created_at: now,
            updated_at: now,
        };

        state.jobs.push(job.clone());
        state.job_history.insert(job.id, vec![job.clone()]);
        Ok(job)
    }

    async fn latest_job(&self, game_id: Uuid) -> Result<Job, GatewayError> {
        self.state()
            .jobs
            .iter()
            .filter(|j| j.game_id == game_id)
            .last()
            .cloned()
            .ok_or(GatewayError::NotFound("job"))
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, GatewayError> {
        self.state().write_job(job_id, update)
    }

    async fn complete_job(&self, job_id: Uuid, message: String) -> Result<Job, GatewayError> {
        let update = super::completion(message);
        let mut state = self.state();

        let job = state.job(job_id)?;
        super::check_job_update(job, &update)?;
        let game_id = job.game_id;

        let game = state
            .games
            .get_mut(&game_id)
            .ok_or(GatewayError::NotFound("game"))?;
        super::check_game_status(game)?;
        game.status = GameStatus::Completed;
        game.processed_at = Some(chrono::Utc::now());

        state.write_job(job_id, update)
    }

    async fn insert_players(&self, players: &[Player]) -> Result<(), GatewayError> {
        self.state().players.extend_from_slice(players);
        Ok(())
    }

    async fn players(&self, game_id: Uuid) -> Result<Vec<Player>, GatewayError> {
        Ok(self
            .state()
            .players
            .iter()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn insert_events(&self, events: &[Event]) -> Result<(), GatewayError> {
        self.state().events.extend_from_slice(events);
        Ok(())
    }

    async fn events(&self, game_id: Uuid) -> Result<Vec<Event>, GatewayError> {
        let mut events: Vec<Event> = self
            .state()
            .events
            .iter()
            .filter(|e| e.game_id == game_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(events)
    }

    async fn insert_formation(&self, snapshot: &FormationSnapshot) -> Result<(), GatewayError> {
        self.state().formations.push(snapshot.clone());
        Ok(())
    }

    async fn formations(&self, game_id: Uuid) -> Result<Vec<FormationSnapshot>, GatewayError> {
        let mut formations: Vec<FormationSnapshot> = self
            .state()
            .formations
            .iter()
            .filter(|f| f.game_id == game_id)
            .cloned()
            .collect();
        formations.sort_by_key(|f| (f.timestamp, f.side.as_str()));
        Ok(formations)
    }

    async fn insert_stats(
        &self,
        players: &[PlayerStats],
        teams: &[TeamStats],
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.player_stats.extend_from_slice(players);
        state.team_stats.extend_from_slice(teams);
        Ok(())
    }

    async fn player_stats(&self, game_id: Uuid) -> Result<Vec<PlayerStats>, GatewayError> {
        Ok(self
            .state()
            .player_stats
            .iter()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn team_stats(&self, game_id: Uuid) -> Result<Vec<TeamStats>, GatewayError> {
        Ok(self
            .state()
            .team_stats
            .iter()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn dashboard(&self, owner: &str) -> Result<DashboardStats, GatewayError> {
        let state = self.state();

        let mut finished: Vec<_> = state
            .jobs
            .iter()
            .filter(|j| j.owner == owner && j.stage == Stage::Complete)
            .map(|j| (j.created_at, j.updated_at))
            .collect();
        finished.sort_by(|a, b| b.1.cmp(&a.1));
        finished.truncate(super::DASHBOARD_JOB_WINDOW);

        Ok(DashboardStats {
            total_games: state.games.values().filter(|g| g.owner == owner).count(),
            total_events: state.events.iter().filter(|e| e.owner == owner).count(),
            completed_games: state
                .games
                .values()
                .filter(|g| g.owner == owner && g.status == GameStatus::Completed)
                .count(),
            avg_processing_minutes: super::average_processing_minutes(&finished),
        })
    }
}
