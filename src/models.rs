/// Data for the /v1/models endpoint.
/// This endpoint mimics the openai API's models endpoint. Each 'model' is an entry in the
/// model registry, i.e. a model id the gate will accept.
use serde::{Deserialize, Serialize};

use crate::registry::ModelRegistry;

/// The returned models from the /v1/models endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Model {
    /// The model identifier, which can be referenced in the API endpoints.
    pub(crate) id: String,
    /// The Unix timestamp (in seconds) when the model was created.
    pub(crate) created: Option<u32>,
    /// The object type, which is always "model".
    pub(crate) object: String,
    /// The organization that owns the model.
    pub(crate) owned_by: String,
}

impl Model {
    pub(crate) fn new(id: String) -> Self {
        Model {
            id,
            created: None,
            object: "model".into(),
            owned_by: "chatgate".into(),
        }
    }
}

/// The response from the /v1/models endpoint, which is a list of models.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ListModelResponse {
    /// The object type, which is always "list".
    pub object: String,
    /// A list of model objects.
    pub data: Vec<Model>,
}

impl ListModelResponse {
    /// Creates a new ListModelResponse from the registered models.
    pub(crate) fn from_registry<R: ModelRegistry + ?Sized>(registry: &R) -> Self {
        let data = registry
            .list()
            .into_iter()
            .map(|(id, _)| Model::new(id))
            .collect::<Vec<_>>();
        ListModelResponse {
            object: "list".into(),
            data,
        }
    }
}
