/// The model registry decides which model identifiers the gate accepts, and whether a model
/// produces text or video. Models are read from a JSON config file; when the file changes the
/// registry is updated in place.
///
/// Incoming requests naming a model that is not registered are rejected before any content
/// validation happens.
use anyhow::anyhow;
use async_trait::async_trait;
use bon::Builder;
use dashmap::DashMap;
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use url::Url;

/// What a model is registered as.
///
/// ## Capability
/// `video: true` routes validated requests to the video completion service, together with the
/// resolved video parameters. Everything else goes to the text completion service.
///
/// ## Forwarding
/// `url`, `upstream_model` and `key` are only read by the upstream forwarding service: the
/// base URL to post to, the model name to put in the forwarded body, and the bearer key to send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
pub struct ModelInfo {
    #[serde(default)]
    #[builder(default)]
    pub video: bool,
    pub url: Option<Url>,
    pub upstream_model: Option<String>,
    pub key: Option<String>,
}

/// The answer to a capability lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCapability {
    Unknown,
    Text,
    Video,
}

/// Lookup interface used by the validator and the handlers.
pub trait ModelRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<ModelInfo>;

    /// All registered models, sorted by id.
    fn list(&self) -> Vec<(String, ModelInfo)>;

    fn is_valid(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn capability(&self, name: &str) -> ModelCapability {
        match self.get(name) {
            None => ModelCapability::Unknown,
            Some(info) if info.video => ModelCapability::Video,
            Some(_) => ModelCapability::Text,
        }
    }
}

/// The config file contains a map of model ids to model entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub models: HashMap<String, ModelInfo>,
}

/// The live-updating collection of models.
#[derive(Debug, Clone, Default)]
pub struct Models {
    pub models: Arc<DashMap<String, ModelInfo>>,
}

impl FromIterator<(String, ModelInfo)> for Models {
    fn from_iter<I: IntoIterator<Item = (String, ModelInfo)>>(iter: I) -> Self {
        Models {
            models: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl ModelRegistry for Models {
    fn get(&self, name: &str) -> Option<ModelInfo> {
        self.models.get(name).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<(String, ModelInfo)> {
        let mut models: Vec<_> = self
            .models
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        models.sort_by(|a, b| a.0.cmp(&b.0));
        models
    }
}

#[async_trait]
pub trait ModelsStream {
    async fn receive(&self)
    -> Result<mpsc::Receiver<Result<Models, anyhow::Error>>, anyhow::Error>;
}

pub struct WatchedFile(pub PathBuf);

#[async_trait]
impl ModelsStream for WatchedFile {
    /// Watches a file for changes and returns a stream of Models updates.
    async fn receive(
        &self,
    ) -> Result<mpsc::Receiver<Result<Models, anyhow::Error>>, anyhow::Error> {
        let (models_tx, models_rx) = mpsc::channel(100);
        let (file_tx, mut file_rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = file_tx.blocking_send(res);
            },
            NotifyConfig::default(),
        )?;

        watcher.watch(&self.0, RecursiveMode::NonRecursive)?;

        let config_path = self.0.clone();
        tokio::spawn(async move {
            // The watcher lives as long as this task.
            let _watcher = watcher;
            while let Some(res) = file_rx.recv().await {
                let update = match res {
                    Ok(event) if event.kind.is_modify() => {
                        info!("Models file changed, reloading...");
                        Models::from_config_file(&config_path).await
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        error!("Watch error: {}", e);
                        Err(anyhow!("Watch error: {}", e))
                    }
                };
                if models_tx.send(update).await.is_err() {
                    break; // Receiver dropped
                }
            }
        });

        Ok(models_rx)
    }
}

impl Models {
    pub async fn from_config_file(config_path: &PathBuf) -> Result<Self, anyhow::Error> {
        let contents = tokio::fs::read_to_string(config_path).await.map_err(|e| {
            anyhow!(
                "Failed to read models file {}: {}",
                config_path.display(),
                e
            )
        })?;

        let config_file: ConfigFile = serde_json::from_str(&contents).map_err(|e| {
            anyhow!(
                "Failed to parse models file {}: {}",
                config_path.display(),
                e
            )
        })?;

        let models = Self::from_config(config_file);

        info!(
            "Loaded {} models from {}",
            models.models.len(),
            config_path.display()
        );
        Ok(models)
    }

    pub fn from_config(config_file: ConfigFile) -> Self {
        for (name, info) in &config_file.models {
            debug!(model = %name, video = info.video, "Registering model");
        }
        config_file.models.into_iter().collect()
    }

    /// Receives updates from a stream of models and updates the internal map.
    pub async fn receive_updates<W: ModelsStream + Send + 'static>(
        &self,
        models_stream: W,
    ) -> Result<(), anyhow::Error> {
        let models = Arc::clone(&self.models);

        let mut rx = models_stream.receive().await?;

        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(new_models) => {
                        info!("Updating registered models");
                        // Update in place rather than clearing, so lookups never see an empty map.
                        models.retain(|key, _| new_models.models.contains_key(key));
                        for entry in new_models.models.iter() {
                            models.insert(entry.key().clone(), entry.value().clone());
                        }
                    }
                    Err(e) => {
                        error!("Failed to reload models: {}", e);
                    }
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub struct MockModelsWatcher {
        configs: Vec<Result<Models, String>>,
    }

    impl MockModelsWatcher {
        pub fn with_models(models_list: Vec<Models>) -> Self {
            Self {
                configs: models_list.into_iter().map(Ok).collect(),
            }
        }

        pub fn with_error(error: String) -> Self {
            Self {
                configs: vec![Err(error)],
            }
        }
    }

    #[async_trait]
    impl ModelsStream for MockModelsWatcher {
        async fn receive(
            &self,
        ) -> Result<mpsc::Receiver<Result<Models, anyhow::Error>>, anyhow::Error> {
            let (tx, rx) = mpsc::channel(100);

            let configs = self.configs.clone();
            tokio::spawn(async move {
                for config in configs {
                    let result = config.map_err(|e| anyhow::anyhow!(e));
                    if tx.send(result).await.is_err() {
                        break;
                    }
                    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                }
            });

            Ok(rx)
        }
    }

    fn create_test_models(models: Vec<(&str, bool)>) -> Models {
        models
            .into_iter()
            .map(|(name, video)| (name.to_string(), ModelInfo::builder().video(video).build()))
            .collect()
    }

    #[test]
    fn test_capability_lookup() {
        let models = create_test_models(vec![("grok-4", false), ("grok-imagine", true)]);

        assert_eq!(models.capability("grok-4"), ModelCapability::Text);
        assert_eq!(models.capability("grok-imagine"), ModelCapability::Video);
        assert_eq!(models.capability("gpt-9"), ModelCapability::Unknown);
        assert!(models.is_valid("grok-4"));
        assert!(!models.is_valid(""));
    }

    #[test]
    fn test_from_config_parses_file_format() {
        let config: ConfigFile = serde_json::from_str(
            r#"{
                "models": {
                    "grok-4": {"url": "https://api.example.com", "key": "sk-1"},
                    "grok-imagine": {"video": true, "upstream_model": "imagine-v1"}
                }
            }"#,
        )
        .unwrap();

        let models = Models::from_config(config);
        let text = models.get("grok-4").unwrap();
        assert!(!text.video);
        assert_eq!(text.url.unwrap().as_str(), "https://api.example.com/");
        assert_eq!(text.key.as_deref(), Some("sk-1"));

        let video = models.get("grok-imagine").unwrap();
        assert!(video.video);
        assert_eq!(video.upstream_model.as_deref(), Some("imagine-v1"));
    }

    #[test]
    fn test_list_is_sorted() {
        let models = create_test_models(vec![("b", false), ("a", true), ("c", false)]);
        let ids: Vec<String> = models.list().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_watcher_updates_models() {
        let initial = create_test_models(vec![("grok-4", false)]);
        let updated = create_test_models(vec![("grok-4", false), ("grok-imagine", true)]);

        initial
            .receive_updates(MockModelsWatcher::with_models(vec![updated]))
            .await
            .unwrap();

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(initial.models.len(), 2);
        assert_eq!(initial.capability("grok-imagine"), ModelCapability::Video);
    }

    #[tokio::test]
    async fn test_watcher_removes_deleted_models() {
        let initial = create_test_models(vec![("grok-4", false), ("grok-3", false)]);
        let updated = create_test_models(vec![("grok-4", true)]);

        initial
            .receive_updates(MockModelsWatcher::with_models(vec![updated]))
            .await
            .unwrap();

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(initial.models.len(), 1);
        assert!(!initial.is_valid("grok-3"));
        assert_eq!(initial.capability("grok-4"), ModelCapability::Video);
    }

    #[tokio::test]
    async fn test_watcher_errors_keep_current_models() {
        let models = create_test_models(vec![("grok-4", false)]);

        models
            .receive_updates(MockModelsWatcher::with_error("bad file".to_string()))
            .await
            .unwrap();

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(models.models.len(), 1);
        assert!(models.is_valid("grok-4"));
    }
}
