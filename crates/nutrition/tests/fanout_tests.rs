//! End-to-end fan-out/fan-in tests over the in-process transport.
//!
//! A stand-in ingredient service answers lookup requests from a fixture
//! catalog while the real [`RecipeWorker`] runs against the same bus.

use messaging::channel::{CorrelatedChannel, send_json};
use messaging::envelope::Correlation;
use messaging::error::{ChannelError, TransportError, WorkerError};
use messaging::mem::MemoryBus;
use messaging::transport::MessageSource;
use messaging::worker::Worker;
use nutrition::service::NutritionService;
use nutrition::worker::{LookupSession, RecipeWorker, SessionFactory};
use recipeline_core::config::NutritionConfig;
use recipeline_core::dto::{FindIngredientDto, IngredientDto, RecipeDto, RecipeNutritionsDto};
use recipeline_core::model::{Ingredient, NutritionFacts, Recipe, RecipeIngredient};
use recipeline_core::topics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct MemSessions {
  bus: Arc<MemoryBus>,
}

impl SessionFactory for MemSessions {
  fn open(&self) -> Result<LookupSession, TransportError> {
    Ok(LookupSession {
      requests: Box::new(self.bus.sink(topics::INGREDIENTS_REQ)),
      responses: Box::new(self.bus.source(topics::INGREDIENTS)),
      results: Box::new(self.bus.sink(topics::NUTRITION_FACTS)),
    })
  }
}

fn test_config() -> NutritionConfig {
  NutritionConfig {
    recipe_timeout: Duration::from_secs(2),
    read_wait: Duration::from_millis(10),
    ..NutritionConfig::default()
  }
}

fn spawn_worker(bus: &Arc<MemoryBus>) -> (broadcast::Sender<()>, JoinHandle<Result<(), WorkerError>>) {
  let config = test_config();
  let mut worker = RecipeWorker::new(
    NutritionService::new(&config),
    Box::new(bus.source(topics::RECIPES)),
    Arc::new(MemSessions { bus: Arc::clone(bus) }),
    &config,
  );

  let (shutdown, receiver) = broadcast::channel(1);
  let handle = tokio::spawn(async move { worker.process(receiver).await });
  (shutdown, handle)
}

/// Stand-in ingredient service: answers every lookup request out of the
/// catalog; unlisted ids get an error response.
fn spawn_ingredient_service(bus: &Arc<MemoryBus>, catalog: HashMap<String, Ingredient>) {
  let mut requests = bus.source(topics::INGREDIENTS_REQ);
  let responses = bus.sink(topics::INGREDIENTS);
  tokio::spawn(async move {
    loop {
      let envelope = match requests.next(Duration::from_millis(50)).await {
        Ok(Some(envelope)) => envelope,
        Ok(None) => continue,
        Err(_) => return,
      };
      let Ok(request) = envelope.decode::<FindIngredientDto>() else {
        continue;
      };
      let reply = match catalog.get(&request.ingredient_id) {
        Some(ingredient) => IngredientDto::found(ingredient.clone()),
        None => IngredientDto::failed(&request.ingredient_id, "ingredient not found"),
      };
      send_json(&responses, &request.ingredient_id, &reply, None).await;
    }
  });
}

fn facts_channel(bus: &MemoryBus) -> CorrelatedChannel {
  CorrelatedChannel::new(
    Box::new(bus.sink(topics::NUTRITION_FACTS)),
    Box::new(bus.source(topics::NUTRITION_FACTS)),
  )
  .with_read_wait(Duration::from_millis(10))
}

fn ingredient(id: &str, base_unit: &str, facts: Option<NutritionFacts>) -> Ingredient {
  Ingredient {
    id: id.to_string(),
    name: format!("ingredient {id}"),
    base_unit: base_unit.to_string(),
    nutrition_facts: facts,
  }
}

fn entry(id: &str, unit: &str, amount: f64) -> RecipeIngredient {
  RecipeIngredient {
    ingredient_id: id.to_string(),
    unit: unit.to_string(),
    amount,
  }
}

fn recipe(id: &str, entries: Vec<RecipeIngredient>) -> Recipe {
  Recipe {
    id: id.to_string(),
    name: format!("recipe {id}"),
    created_by: "user-1".to_string(),
    ingredients: entries,
    steps: vec![],
    nutrition_facts: None,
  }
}

fn full_catalog() -> HashMap<String, Ingredient> {
  HashMap::from([
    ("1".to_string(), ingredient("1", "шт", Some(NutritionFacts::new(50.0, 5.0, 10.0, 15.0)))),
    ("2".to_string(), ingredient("2", "г", Some(NutritionFacts::new(1.0, 0.5, 0.3, 0.1)))),
    ("3".to_string(), ingredient("3", "мл", Some(NutritionFacts::new(0.5, 0.0, 0.8, 0.4)))),
  ])
}

fn three_entry_recipe(id: &str) -> Recipe {
  recipe(id, vec![entry("1", "шт", 1.0), entry("2", "г", 15.0), entry("3", "мл", 65.0)])
}

async fn publish_recipe(bus: &MemoryBus, recipe: Recipe) {
  let dto = RecipeDto::new(recipe);
  send_json(&bus.sink(topics::RECIPES), &dto.recipe_id, &dto, None).await;
}

#[tokio::test]
async fn test_full_result_end_to_end() {
  let bus = Arc::new(MemoryBus::new());
  spawn_ingredient_service(&bus, full_catalog());
  let (shutdown, worker) = spawn_worker(&bus);
  let mut facts = facts_channel(&bus);

  publish_recipe(&bus, three_entry_recipe("r1")).await;

  let result: RecipeNutritionsDto = facts
    .receive_matching(&Correlation::Key("r1".to_string()), Duration::from_secs(3))
    .await
    .unwrap();

  assert_eq!(result.recipe_id, "r1");
  assert!(!result.is_inaccurate);
  assert_eq!(result.nutrition_facts.calories, 50.0 + 15.0 * 1.0 + 65.0 * 0.5);
  assert_eq!(result.nutrition_facts.proteins, 5.0 + 15.0 * 0.5);
  assert_eq!(result.nutrition_facts.fats, 10.0 + 15.0 * 0.3 + 65.0 * 0.8);
  assert_eq!(result.nutrition_facts.carbohydrates, 15.0 + 15.0 * 0.1 + 65.0 * 0.4);

  shutdown.send(()).unwrap();
  assert!(worker.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_lookup_error_counts_as_unknown() {
  let bus = Arc::new(MemoryBus::new());
  let mut catalog = full_catalog();
  catalog.remove("1");
  spawn_ingredient_service(&bus, catalog);
  let (shutdown, _worker) = spawn_worker(&bus);
  let mut facts = facts_channel(&bus);

  publish_recipe(&bus, three_entry_recipe("r2")).await;

  // One error response out of three: inaccurate, not fatal.
  let result: RecipeNutritionsDto = facts
    .receive_matching(&Correlation::Key("r2".to_string()), Duration::from_secs(3))
    .await
    .unwrap();

  assert!(result.is_inaccurate);
  assert_eq!(result.nutrition_facts.calories, 15.0 * 1.0 + 65.0 * 0.5);
  assert_eq!(result.nutrition_facts.proteins, 15.0 * 0.5);

  let _ = shutdown.send(());
}

#[tokio::test]
async fn test_unannotated_ingredient_flags_result() {
  let bus = Arc::new(MemoryBus::new());
  let mut catalog = full_catalog();
  catalog.insert("1".to_string(), ingredient("1", "шт", None));
  spawn_ingredient_service(&bus, catalog);
  let (shutdown, _worker) = spawn_worker(&bus);
  let mut facts = facts_channel(&bus);

  publish_recipe(&bus, three_entry_recipe("r3")).await;

  let result: RecipeNutritionsDto = facts
    .receive_matching(&Correlation::Key("r3".to_string()), Duration::from_secs(3))
    .await
    .unwrap();

  assert!(result.is_inaccurate);
  assert_eq!(result.nutrition_facts.fats, 15.0 * 0.3 + 65.0 * 0.8);

  let _ = shutdown.send(());
}

#[tokio::test]
async fn test_insufficient_data_emits_nothing() {
  let bus = Arc::new(MemoryBus::new());
  // Nothing in the catalog: every lookup fails.
  spawn_ingredient_service(&bus, HashMap::new());
  let (shutdown, _worker) = spawn_worker(&bus);
  let mut facts = facts_channel(&bus);

  publish_recipe(&bus, recipe("r4", vec![entry("1", "г", 10.0), entry("2", "мл", 1000.0)])).await;

  let result = facts
    .receive_matching::<RecipeNutritionsDto>(&Correlation::Key("r4".to_string()), Duration::from_millis(500))
    .await;
  assert!(matches!(result, Err(ChannelError::Timeout)));

  let _ = shutdown.send(());
}

#[tokio::test]
async fn test_foreign_response_traffic_is_discarded() {
  let bus = Arc::new(MemoryBus::new());
  spawn_ingredient_service(&bus, full_catalog());
  let (shutdown, _worker) = spawn_worker(&bus);
  let mut facts = facts_channel(&bus);

  // Keep unrelated lookup responses flowing on the shared topic while the
  // fan-out is collecting.
  let noise_sink = bus.sink(topics::INGREDIENTS);
  let noise_task = tokio::spawn(async move {
    let stranger = IngredientDto::failed("999", "not yours");
    loop {
      send_json(&noise_sink, "999", &stranger, None).await;
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  });

  publish_recipe(&bus, three_entry_recipe("r5")).await;

  let result: RecipeNutritionsDto = facts
    .receive_matching(&Correlation::Key("r5".to_string()), Duration::from_secs(3))
    .await
    .unwrap();
  assert!(!result.is_inaccurate);

  noise_task.abort();
  let _ = shutdown.send(());
}

#[tokio::test]
async fn test_two_recipes_aggregate_concurrently() {
  let bus = Arc::new(MemoryBus::new());
  spawn_ingredient_service(&bus, full_catalog());
  let (shutdown, _worker) = spawn_worker(&bus);
  let mut facts_a = facts_channel(&bus);
  let mut facts_b = facts_channel(&bus);

  publish_recipe(&bus, three_entry_recipe("ra")).await;
  publish_recipe(&bus, recipe("rb", vec![entry("2", "г", 100.0)])).await;

  let result_b: RecipeNutritionsDto = facts_b
    .receive_matching(&Correlation::Key("rb".to_string()), Duration::from_secs(3))
    .await
    .unwrap();
  let result_a: RecipeNutritionsDto = facts_a
    .receive_matching(&Correlation::Key("ra".to_string()), Duration::from_secs(3))
    .await
    .unwrap();

  assert_eq!(result_a.recipe_id, "ra");
  assert_eq!(result_a.nutrition_facts.proteins, 5.0 + 15.0 * 0.5);
  assert_eq!(result_b.recipe_id, "rb");
  assert_eq!(result_b.nutrition_facts.calories, 100.0);
  assert!(!result_b.is_inaccurate);

  let _ = shutdown.send(());
}

#[tokio::test]
async fn test_worker_exits_cleanly_on_shutdown() {
  let bus = Arc::new(MemoryBus::new());
  let (shutdown, worker) = spawn_worker(&bus);

  tokio::time::sleep(Duration::from_millis(30)).await;
  shutdown.send(()).unwrap();

  let result = tokio::time::timeout(Duration::from_secs(1), worker).await.unwrap();
  assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_worker_fails_terminally_when_recipe_stream_closes() {
  let bus = Arc::new(MemoryBus::new());
  let config = test_config();
  let mut worker = RecipeWorker::new(
    NutritionService::new(&config),
    Box::new(bus.source(topics::RECIPES)),
    Arc::new(MemSessions { bus: Arc::clone(&bus) }),
    &config,
  );

  let (shutdown, receiver) = broadcast::channel(1);
  let handle = tokio::spawn(async move { worker.process(receiver).await });

  // Tear the recipes topic down underneath the worker.
  tokio::time::sleep(Duration::from_millis(20)).await;
  bus.drop_topic(topics::RECIPES);

  let result = tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap();
  assert!(matches!(result.unwrap(), Err(WorkerError::Terminal(_))));
  drop(shutdown);
}
