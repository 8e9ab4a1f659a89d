use std::sync::Arc;

use aspire_lib::db::{Database, DATABASE_FILE_NAME};
use aspire_lib::models::{Category, WardrobeItemInput};
use aspire_lib::settings::SettingsStore;
use aspire_lib::stage::Stage;
use aspire_lib::store::Store;
use aspire_lib::testing::{test_settings, ScriptedLlm};
use aspire_lib::AppState;
use tempfile::tempdir;

const ARCHETYPE: &str = r#"{"name": "Quiet Minimalist", "description": "Calm, precise dressing.",
  "colorPalette": ["black", "white", "grey"], "silhouettes": ["straight"], "archetypes": ["knit"],
  "styleStatement": "Less, but better.", "behavioralCues": ["plan outfits"]}"#;

async fn open(dir: &std::path::Path, llm: Arc<ScriptedLlm>) -> AppState {
    let database = Database::new(dir.join(DATABASE_FILE_NAME)).unwrap();
    let store = Store::open(Arc::new(database)).await.unwrap();
    let settings = SettingsStore::in_memory(dir.join("settings.json"), test_settings());
    AppState::with_parts(store, llm, settings)
}

#[tokio::test]
async fn onboarding_to_recommendations_survives_a_restart() {
    let dir = tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::with_texts(vec![
        ARCHETYPE.to_string(),
        r#"[{"aspirationName": "Quiet Minimalist", "matchScore": 90, "reasoning": "clean"}]"#.into(),
        r#"[{"aspirationName": "Quiet Minimalist", "matchScore": 20, "reasoning": "loud"}]"#.into(),
        r#"{"colors": ["black"], "silhouette": "straight", "formality": "casual", "alignmentScore": 80, "insight": "On point."}"#.into(),
        "not json".into(),
        r#"[{"type": "consider-adding", "item": "Grey overshirt", "reason": "layering", "priority": "high"}]"#.into(),
    ]));
    let state = open(dir.path(), llm.clone()).await;

    state.store.create_user("Sam").await.unwrap();
    state
        .identity
        .create_identity(vec!["minimal".into()], vec![])
        .await
        .unwrap();
    assert_eq!(Stage::of(&state.store.snapshot().await), Stage::SteadyState);
    let aspiration_id = state.store.aspirations().await[0].id.clone();

    let mut item_ids = Vec::new();
    for (name, category) in [("Black knit", Category::Top), ("Neon shorts", Category::Bottom)] {
        let item = state
            .store
            .add_item(WardrobeItemInput {
                name: name.into(),
                category,
                ..WardrobeItemInput::default()
            })
            .await
            .unwrap();
        item_ids.push(item.id);
    }
    let report = state.wardrobe.analyze_wardrobe(|_| {}).await.unwrap();
    assert_eq!(report.analyzed, 2);

    state
        .behavior
        .log_outfit(vec![item_ids[0].clone()], Some(aspiration_id.clone()), None)
        .await
        .unwrap();

    // The model's alignment answer is unreadable, so the computed scores are used.
    let alignment = state.alignment.update_alignment().await.unwrap();
    assert_eq!(alignment.wardrobe.score, 50);
    assert_eq!(alignment.behavior.score, 100);
    assert_eq!(alignment.overall, 70);

    let recs = state
        .recommendations
        .generate_recommendations(Some(&aspiration_id))
        .await
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(llm.call_count().await, 6);

    let before = state.store.snapshot().await;
    drop(state);

    let reopened = open(dir.path(), Arc::new(ScriptedLlm::new())).await;
    assert_eq!(reopened.store.snapshot().await, before);
    let summary = reopened.progress.report().await;
    assert_eq!(summary.stage, Stage::SteadyState);
    assert_eq!(summary.stats.analyzed_items, 2);
    assert_eq!(summary.weekly.logs, 1);
}

#[tokio::test]
async fn export_then_import_into_a_fresh_store() {
    let dir = tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::with_texts(vec![ARCHETYPE]));
    let state = open(dir.path(), llm).await;
    state.store.create_user("Sam").await.unwrap();
    state
        .identity
        .create_identity(vec!["minimal".into()], vec![])
        .await
        .unwrap();

    let exported = state.store.export_data().await.unwrap();

    let other = tempdir().unwrap();
    let fresh = open(other.path(), Arc::new(ScriptedLlm::new())).await;
    fresh.store.import_data(exported).await.unwrap();
    assert_eq!(fresh.store.snapshot().await, state.store.snapshot().await);
}
