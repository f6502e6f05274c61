//! Doctor - Tokenizer availability checking

use anyhow::Result;

use crate::core::model::DependencyStatus;
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::{TokenModel, Tokenizer};

impl DependencyStatus {
    fn from_tokenizer(tokenizer: &Tokenizer, active: TokenModel) -> Self {
        let model = tokenizer.model();
        let notes = match tokenizer.load_error() {
            Some(err) => Some(format!("{}; counts fall back to bytes/4", err)),
            None if model == TokenModel::Heuristic => {
                Some("bytes/4 estimate, always available".to_string())
            }
            None => None,
        };

        let name = if model == TokenModel::Heuristic {
            tokenizer.encoder_info()
        } else {
            format!("{} ({})", model, tokenizer.encoder_info())
        };

        Self {
            name,
            available: tokenizer.is_available() || model == TokenModel::Heuristic,
            active: model == active,
            notes,
        }
    }
}

/// Check every tokenizer model
pub fn check_tokenizers(active: TokenModel) -> Vec<DependencyStatus> {
    [TokenModel::O200k, TokenModel::Cl100k, TokenModel::Heuristic]
        .into_iter()
        .map(|model| DependencyStatus::from_tokenizer(&Tokenizer::new(model), active))
        .collect()
}

/// Run the doctor command
pub fn run_doctor(active: TokenModel, config: RenderConfig) -> Result<()> {
    let deps = check_tokenizers(active);

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_doctor(&deps));

    if deps.iter().any(|d| d.active && !d.available) {
        eprintln!("\n⚠️  The selected tokenizer is unavailable; counts are estimates");
    }

    Ok(())
}
