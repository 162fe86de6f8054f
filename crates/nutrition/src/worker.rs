//! Fan-out/fan-in orchestration for recipe nutrition.
//!
//! [`RecipeWorker`] consumes the recipes topic. Every recipe spawns a
//! detached [`FanOut`] task with its own transport handles and its own
//! accumulation map, so concurrent recipes never share state. The task
//! publishes all ingredient lookups up front, then runs a single fan-in
//! loop over the shared response topic until every reference is resolved
//! or the recipe's time budget is spent.

use crate::service::NutritionService;
use async_trait::async_trait;
use messaging::channel::send_json;
use messaging::error::{StopError, TransportError, WorkerError};
use messaging::transport::{MessageSink, MessageSource};
use messaging::worker::{Worker, shutdown_requested};
use recipeline_core::config::NutritionConfig;
use recipeline_core::dto::{FindIngredientDto, IngredientDto, RecipeDto};
use recipeline_core::model::{Ingredient, Recipe};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Transport handles for one recipe's lookup fan-out. Owned by exactly one
/// orchestration task for its whole lifetime.
pub struct LookupSession {
  /// Producer on the ingredient lookup request topic.
  pub requests: Box<dyn MessageSink>,
  /// This task's own subscription to the shared lookup response topic.
  pub responses: Box<dyn MessageSource>,
  /// Producer on the nutrition result topic.
  pub results: Box<dyn MessageSink>,
}

/// Opens a fresh [`LookupSession`] per fan-out, so handles are never
/// shared across concurrent recipes.
pub trait SessionFactory: Send + Sync {
  fn open(&self) -> Result<LookupSession, TransportError>;
}

pub struct RecipeWorker {
  service: NutritionService,
  recipes: Box<dyn MessageSource>,
  sessions: Arc<dyn SessionFactory>,
  recipe_timeout: Duration,
  read_wait: Duration,
}

impl RecipeWorker {
  pub fn new(
    service: NutritionService,
    recipes: Box<dyn MessageSource>,
    sessions: Arc<dyn SessionFactory>,
    config: &NutritionConfig,
  ) -> Self {
    Self {
      service,
      recipes,
      sessions,
      recipe_timeout: config.recipe_timeout,
      read_wait: config.read_wait,
    }
  }
}

#[async_trait]
impl Worker for RecipeWorker {
  fn name(&self) -> &str {
    "recipe-nutrition"
  }

  async fn process(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), WorkerError> {
    loop {
      if shutdown_requested(&mut shutdown) {
        return Ok(());
      }

      let envelope = match self.recipes.next(self.read_wait).await {
        Ok(None) => continue,
        Ok(Some(envelope)) => envelope,
        Err(e) if e.is_terminal() => return Err(WorkerError::Terminal(e)),
        Err(e) => {
          warn!(error = %e, "error receiving recipe message");
          continue;
        }
      };

      let dto: RecipeDto = match envelope.decode() {
        Ok(dto) => dto,
        Err(e) => {
          warn!(error = %e, key = %envelope.key, "failed to decode recipe message, skipping");
          continue;
        }
      };
      if let Some(lookup_error) = dto.error {
        debug!(recipe_id = %dto.recipe_id, error = %lookup_error, "skipping failed recipe lookup event");
        continue;
      }
      let Some(recipe) = dto.recipe else { continue };
      if dto.recipe_id.is_empty() || recipe.id.is_empty() {
        continue;
      }
      info!(recipe_id = %recipe.id, ingredients = recipe.ingredients.len(), "got recipe for nutrition calculation");

      let session = match self.sessions.open() {
        Ok(session) => session,
        Err(e) => {
          error!(error = %e, recipe_id = %recipe.id, "could not open lookup session");
          continue;
        }
      };

      let fan_out = FanOut {
        service: self.service.clone(),
        session,
        recipe_timeout: self.recipe_timeout,
        read_wait: self.read_wait,
        shutdown: shutdown.resubscribe(),
      };
      tokio::spawn(fan_out.run(recipe));
    }
  }

  fn stop(&mut self) -> Result<(), StopError> {
    let mut stop = StopError::default();
    if let Err(e) = self.recipes.close() {
      stop.push(e);
    }
    stop.into_result()
  }
}

/// One recipe's orchestration: owns the session, the pending-reference set
/// and the accumulation map; all three are discarded when `run` returns.
struct FanOut {
  service: NutritionService,
  session: LookupSession,
  recipe_timeout: Duration,
  read_wait: Duration,
  shutdown: broadcast::Receiver<()>,
}

impl FanOut {
  async fn run(mut self, recipe: Recipe) {
    let resolved = self.resolve_ingredients(&recipe).await;

    match self.service.calc_recipe_nutritions(&recipe, &resolved) {
      Ok(result) => {
        send_json(self.session.results.as_ref(), &result.recipe_id, &result, None).await;
        info!(
          recipe_id = %result.recipe_id,
          is_inaccurate = result.is_inaccurate,
          "sent recipe nutrition facts"
        );
      }
      Err(e) => {
        error!(recipe_id = %recipe.id, error = %e, "failed to calculate recipe nutritions");
      }
    }

    let mut stop = StopError::default();
    if let Err(e) = self.session.requests.close() {
      stop.push(e);
    }
    if let Err(e) = self.session.responses.close() {
      stop.push(e);
    }
    if let Err(e) = self.session.results.close() {
      stop.push(e);
    }
    if let Err(errors) = stop.into_result() {
      warn!(recipe_id = %recipe.id, error = %errors, "failed to release lookup session");
    }
  }

  /// Publish every lookup, then collect answers until nothing is pending
  /// or the recipe's budget is spent. Whatever is still pending at that
  /// point simply stays unknown; the aggregator decides what that means.
  async fn resolve_ingredients(&mut self, recipe: &Recipe) -> HashMap<String, Ingredient> {
    let mut pending: HashSet<String> = HashSet::new();
    for entry in &recipe.ingredients {
      if pending.insert(entry.ingredient_id.clone()) {
        let request = FindIngredientDto {
          ingredient_id: entry.ingredient_id.clone(),
        };
        send_json(self.session.requests.as_ref(), &request.ingredient_id, &request, None).await;
        debug!(recipe_id = %recipe.id, ingredient_id = %request.ingredient_id, "sent ingredient lookup");
      }
    }

    let mut resolved: HashMap<String, Ingredient> = HashMap::new();
    let deadline = Instant::now() + self.recipe_timeout;

    while !pending.is_empty() {
      if shutdown_requested(&mut self.shutdown) {
        debug!(recipe_id = %recipe.id, "shutdown observed mid fan-out");
        break;
      }
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        warn!(
          recipe_id = %recipe.id,
          pending = pending.len(),
          "ingredient lookups timed out, remaining references stay unknown"
        );
        break;
      }

      let envelope = match self.session.responses.next(remaining.min(self.read_wait)).await {
        Ok(None) => continue,
        Ok(Some(envelope)) => envelope,
        Err(e) if e.is_terminal() => {
          warn!(recipe_id = %recipe.id, "lookup response stream ended mid fan-out");
          break;
        }
        Err(e) => {
          warn!(error = %e, "error receiving ingredient message");
          continue;
        }
      };

      // Shared response topic: anything not keyed to one of our pending
      // references belongs to another waiter.
      if !pending.contains(envelope.key.as_str()) {
        continue;
      }

      let dto: IngredientDto = match envelope.decode() {
        Ok(dto) => dto,
        Err(e) => {
          warn!(error = %e, key = %envelope.key, "failed to decode ingredient message, skipping");
          continue;
        }
      };

      pending.remove(envelope.key.as_str());
      if let Some(lookup_error) = dto.error {
        warn!(
          ingredient_id = %dto.ingredient_id,
          error = %lookup_error,
          "ingredient lookup failed, treating as unknown"
        );
        continue;
      }
      match dto.ingredient {
        Some(ingredient) => {
          resolved.insert(dto.ingredient_id, ingredient);
        }
        None => {
          warn!(ingredient_id = %dto.ingredient_id, "ingredient response carried no data, treating as unknown");
        }
      }
    }

    resolved
  }
}
