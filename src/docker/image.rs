use std::collections::HashSet;

use bollard::models::CreateImageInfo;
use bollard::query_parameters::{CreateImageOptions, ListImagesOptions};
use bollard::Docker;
use futures_util::StreamExt;

use crate::docker::{DockerError, DockerResult};

/// Parse an image reference into (name, tag).
/// "postgres:16" -> ("postgres", "16")
/// "redis" -> ("redis", "latest")
/// "localhost:5000/app" -> ("localhost:5000/app", "latest")
pub fn parse_image_ref(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !name.is_empty() && !tag.is_empty() && !tag.contains('/') => {
            (name, tag)
        }
        _ => (image, "latest"),
    }
}

/// Required images not present among the local tags, in input order and
/// without duplicates.
pub fn missing_images<'a>(required: &[&'a str], available: &HashSet<String>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    required
        .iter()
        .copied()
        .filter(|image| !available.contains(*image))
        .filter(|image| seen.insert(*image))
        .collect()
}

/// All `repo:tag` strings of local images.
pub async fn local_image_tags(docker: &Docker) -> DockerResult<HashSet<String>> {
    let options = ListImagesOptions {
        all: true,
        ..Default::default()
    };
    let images = docker
        .list_images(Some(options))
        .await
        .map_err(|source| DockerError::Api {
            context: "listing images".to_string(),
            source,
        })?;
    Ok(images.into_iter().flat_map(|i| i.repo_tags).collect())
}

/// Pull a single Docker image, draining the progress stream.
pub async fn pull_image(docker: &Docker, image: &str) -> DockerResult<()> {
    let (name, tag) = parse_image_ref(image);
    tracing::debug!(image = %image, "pulling image");

    let options = CreateImageOptions {
        from_image: Some(name.to_string()),
        tag: Some(tag.to_string()),
        ..Default::default()
    };

    let mut stream = docker.create_image(Some(options), None, None);
    while let Some(result) = stream.next().await {
        let info: CreateImageInfo = result.map_err(|source| DockerError::Api {
            context: format!("pulling image {image}"),
            source,
        })?;
        if let Some(err) = &info.error_detail {
            return Err(DockerError::Failed(format!(
                "image pull failed for {}: {}",
                image,
                err.message.as_deref().unwrap_or("unknown error")
            )));
        }
    }

    tracing::debug!(image = %image, "image pulled successfully");
    Ok(())
}
