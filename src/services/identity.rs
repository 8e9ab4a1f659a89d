use std::sync::Arc;

use log::info;

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{prompts, try_parse_structured, LlmClient, Validate};
use crate::models::{Archetype, AspirationInput, Identity, ImageData};
use crate::stage::Stage;
use crate::store::{check_image, Store};

impl Validate for Archetype {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("archetype name is empty".into());
        }
        Ok(())
    }
}

pub struct IdentityService {
    store: Arc<Store>,
    llm: Arc<dyn LlmClient>,
}

impl IdentityService {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, llm }
    }

    pub async fn identity(&self) -> Identity {
        self.store.identity().await
    }

    /// Builds the identity archetype from keywords and inspiration images.
    ///
    /// Nothing is written unless the model returns a usable archetype. When no
    /// aspiration exists yet, one is seeded from the archetype so the user
    /// reaches steady state.
    pub async fn create_identity(
        &self,
        keywords: Vec<String>,
        images: Vec<ImageData>,
    ) -> AdvisorResult<Identity> {
        let doc = self.store.snapshot().await;
        Stage::require(&doc, Stage::IdentityCreation)?;

        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keywords.is_empty() && images.is_empty() {
            return Err(AdvisorError::Validation(
                "provide at least one keyword or inspiration image".into(),
            ));
        }
        for image in &images {
            check_image(image)?;
        }

        let request = prompts::identity_archetype(&keywords, images.len());
        let raw = self.llm.complete(request).await?;
        let archetype: Archetype = try_parse_structured(&raw)?;

        let identity = self
            .store
            .save_identity_with_images(
                Identity {
                    inspiration_images: vec![],
                    keywords: keywords.clone(),
                    archetype: Some(archetype.clone()),
                },
                images,
            )
            .await?;
        info!("Identity archetype created: {}", archetype.name);

        if self.store.aspirations().await.is_empty() {
            let seeded = self
                .store
                .add_aspiration(AspirationInput {
                    name: archetype.name,
                    description: archetype.description,
                    keywords,
                    styles: archetype.silhouettes,
                    colors: archetype.color_palette,
                })
                .await?;
            info!("Seeded first aspiration {}", seeded.id);
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsStore;
    use crate::store::MemoryStore;
    use crate::testing::{test_settings, test_state, ScriptedLlm};
    use crate::AppState;
    use std::path::PathBuf;

    const ARCHETYPE: &str = r#"```json
{"name": "Confident Creative Minimalist", "description": "Clean and bold.",
 "colorPalette": ["black", "white", "camel"], "silhouettes": ["oversized"],
 "archetypes": ["blazer"], "styleStatement": "Less, but better.", "behavioralCues": ["plan outfits"]}
```"#;

    fn png() -> ImageData {
        ImageData {
            media_type: "image/png".into(),
            data: "iVBORw0KGgo=".into(),
        }
    }

    #[tokio::test]
    async fn creates_identity_and_seeds_an_aspiration() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec![ARCHETYPE]));
        let state = test_state(llm.clone()).await;
        state.store.create_user("Sam").await.unwrap();

        let identity = state
            .identity
            .create_identity(vec![" minimal ".into(), "".into(), "bold".into()], vec![png()])
            .await
            .unwrap();

        assert_eq!(identity.keywords, vec!["minimal", "bold"]);
        assert_eq!(identity.inspiration_images.len(), 1);
        assert!(state.store.image(&identity.inspiration_images[0]).await.is_some());
        let aspirations = state.store.aspirations().await;
        assert_eq!(aspirations.len(), 1);
        assert_eq!(aspirations[0].name, "Confident Creative Minimalist");
        assert_eq!(aspirations[0].colors, vec!["black", "white", "camel"]);
        assert_eq!(
            Stage::of(&state.store.snapshot().await),
            Stage::SteadyState
        );
        assert!(llm.calls().await[0].prompt_text().contains("minimal, bold"));
    }

    #[tokio::test]
    async fn parse_failure_is_surfaced_and_nothing_is_written() {
        let llm = Arc::new(ScriptedLlm::with_texts(vec!["I cannot help with that."]));
        let state = test_state(llm).await;
        state.store.create_user("Sam").await.unwrap();

        let err = state
            .identity
            .create_identity(vec!["minimal".into()], vec![png()])
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Parse(_)));
        let doc = state.store.snapshot().await;
        assert!(doc.identity.archetype.is_none());
        assert!(doc.images.is_empty());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_orphan_images() {
        let backend = Arc::new(MemoryStore::new());
        let store = Store::open(backend.clone()).await.unwrap();
        let settings = SettingsStore::in_memory(PathBuf::from("settings.json"), test_settings());
        let llm = Arc::new(ScriptedLlm::with_texts(vec![ARCHETYPE]));
        let state = AppState::with_parts(store, llm, settings);
        state.store.create_user("Sam").await.unwrap();

        backend.set_fail_writes(true);
        let err = state
            .identity
            .create_identity(vec!["minimal".into()], vec![png(), png()])
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Storage(_)));
        let doc = state.store.snapshot().await;
        assert!(doc.images.is_empty());
        assert!(doc.identity.archetype.is_none());
    }

    #[tokio::test]
    async fn needs_a_user_and_some_input() {
        let state = test_state(Arc::new(ScriptedLlm::new())).await;
        assert!(matches!(
            state.identity.create_identity(vec!["x".into()], vec![]).await,
            Err(AdvisorError::Stage { .. })
        ));

        state.store.create_user("Sam").await.unwrap();
        assert!(matches!(
            state.identity.create_identity(vec!["  ".into()], vec![]).await,
            Err(AdvisorError::Validation(_))
        ));
    }
}
