use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    folio_album::SubmissionKey,
    folio_channels::{ChannelOutbound, Choice},
    folio_common::Mode,
    folio_config::FolioConfig,
    folio_review::{
        ImageRef, InMemoryModeStore, ModeStore, OpenAiEvaluator, PipelineSettings,
        SubmissionPipeline, image::mime_from_path,
    },
};

const CONVERSATION: &str = "cli";

/// Prints the pipeline's output: notices to stderr, review fragments to stdout.
struct Terminal;

#[async_trait]
impl ChannelOutbound for Terminal {
    async fn send_text(&self, _to: &str, text: &str) -> folio_channels::Result<()> {
        eprintln!("{text}");
        Ok(())
    }

    async fn send_html(&self, _to: &str, html: &str) -> folio_channels::Result<()> {
        println!("{html}\n");
        Ok(())
    }

    async fn send_choices(
        &self,
        _to: &str,
        text: &str,
        choices: &[Choice],
    ) -> folio_channels::Result<()> {
        eprintln!("{text}");
        for choice in choices {
            eprintln!("  - {}", choice.label);
        }
        Ok(())
    }
}

/// Run local files through the same pipeline the bot uses.
///
/// The files are left in place.
pub async fn handle_review(
    config: &FolioConfig,
    files: Vec<PathBuf>,
    mode: Option<Mode>,
) -> Result<()> {
    let images = local_images(files)?;

    let modes = Arc::new(InMemoryModeStore::default());
    if let Some(mode) = mode {
        modes.set(CONVERSATION, mode).await;
    }
    let pipeline = SubmissionPipeline::new(
        Arc::new(OpenAiEvaluator::from_config(&config.evaluator)?),
        Arc::new(Terminal),
        modes,
        PipelineSettings::from(&config.review),
    );

    pipeline
        .dispatch(&SubmissionKey::solo(CONVERSATION), &images)
        .await?;
    Ok(())
}

fn local_images(files: Vec<PathBuf>) -> Result<Vec<ImageRef>> {
    let mut images = Vec::with_capacity(files.len());
    for path in files {
        if !path.is_file() {
            bail!("not a file: {}", path.display());
        }
        let mime_type = mime_from_path(&path);
        images.push(ImageRef::new(path, mime_type));
    }
    Ok(images)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_images_keep_order_and_guess_mime() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("cover.png");
        let jpg = dir.path().join("page-2.jpg");
        std::fs::write(&png, b"p").unwrap();
        std::fs::write(&jpg, b"j").unwrap();

        let images = local_images(vec![png.clone(), jpg.clone()]).unwrap();
        assert_eq!(images[0], ImageRef::new(&png, "image/png"));
        assert_eq!(images[1], ImageRef::new(&jpg, "image/jpeg"));
        assert!(png.exists());
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = local_images(vec![PathBuf::from("/definitely/not/here.png")]).unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }
}
