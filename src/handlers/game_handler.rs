//! Game Catalog Handler

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Clock, DomainError, Game, NewGame};
use crate::repository::GameRepository;

use super::CreateGameCommand;

/// Reads and writes the game catalog
#[derive(Clone)]
pub struct GameCatalog {
    games: Arc<dyn GameRepository>,
    clock: Arc<dyn Clock>,
}

impl GameCatalog {
    pub fn new(games: Arc<dyn GameRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { games, clock }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Game>, DomainError> {
        Ok(self.games.get_all().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Game>, DomainError> {
        Ok(self.games.get_by_id(id).await?)
    }

    /// Validate and store a new game.
    #[tracing::instrument(skip(self, command), fields(title = %command.title))]
    pub async fn create(&self, command: CreateGameCommand) -> Result<Game, DomainError> {
        let new_game = NewGame::new(&command.title, &command.description, command.price)
            .inspect_err(|e| tracing::warn!(error = %e, "Rejected game"))?;

        let game = new_game.into_game(self.clock.now());
        self.games.create(&game).await?;

        tracing::info!(game_id = %game.id, price = %game.price, "Game created");
        Ok(game)
    }
}
