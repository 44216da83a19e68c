//! Resolves `provider/model` identifiers to registered providers

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::LlmError;
use crate::instructions;
use crate::provider::Provider;
use crate::types::ChatRequest;

/// Split `provider/model` on the first `/`
///
/// Both halves must be non-empty; everything after the first slash belongs
/// to the model id, so `ollama/library/llama3` routes to `ollama`.
pub fn split_model_id(model: &str) -> Result<(&str, &str), LlmError> {
    match model.split_once('/') {
        Some((provider, model_id)) if !provider.is_empty() && !model_id.is_empty() => Ok((provider, model_id)),
        _ => Err(LlmError::InvalidModelId {
            model: model.to_owned(),
        }),
    }
}

/// Provider lookup table, keyed case-insensitively by provider id
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Build the registry once; empty sets and duplicate ids are rejected
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn Provider>>) -> Result<Self, LlmError> {
        let mut map = HashMap::new();

        for provider in providers {
            let key = provider.id().to_lowercase();
            match map.entry(key) {
                Entry::Occupied(_) => {
                    return Err(LlmError::Configuration(format!(
                        "duplicate provider id: {}",
                        provider.id()
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(provider);
                }
            }
        }

        if map.is_empty() {
            return Err(LlmError::Configuration(
                "at least one provider must be configured".to_owned(),
            ));
        }

        Ok(Self { providers: map })
    }

    pub fn get(&self, provider_id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(&provider_id.to_lowercase())
    }

    /// Registered provider ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.providers.values().map(|p| p.id()).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve the provider for `request` and prepare it for dispatch
    ///
    /// The returned request carries the bare model id, a request id and a
    /// correlation id (generated when absent), and its instruction layers
    /// merged into the messages.
    pub fn route(&self, mut request: ChatRequest) -> Result<(Arc<dyn Provider>, ChatRequest), LlmError> {
        let (provider, model_id) = {
            let (provider_id, model_id) = split_model_id(&request.model)?;
            let provider = self.get(provider_id).ok_or_else(|| LlmError::UnknownProvider {
                provider: provider_id.to_owned(),
            })?;
            (Arc::clone(provider), model_id.to_owned())
        };

        request.model = model_id;
        request.request_id = Some(take_or_generate(request.request_id.take()));
        request.correlation_id = Some(take_or_generate(request.correlation_id.take()));

        Ok((provider, instructions::normalize(request)))
    }
}

fn take_or_generate(id: Option<String>) -> String {
    id.filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_takes_first_slash() {
        assert_eq!(split_model_id("openai/gpt-4o").unwrap(), ("openai", "gpt-4o"));
        assert_eq!(split_model_id("ollama/library/llama3").unwrap(), ("ollama", "library/llama3"));
    }

    #[test]
    fn split_rejects_malformed_ids() {
        for bad in ["gpt-4o", "/gpt-4o", "openai/", "/", ""] {
            let err = split_model_id(bad).unwrap_err();
            assert_eq!(err, LlmError::InvalidModelId { model: bad.to_owned() }, "{bad}");
        }
    }

    #[test]
    fn generated_ids_are_32_hex_chars() {
        let id = take_or_generate(None);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, take_or_generate(None));
        assert_eq!(take_or_generate(Some("mine".into())), "mine");
        assert_eq!(take_or_generate(Some(" ".into())).len(), 32);
    }
}
