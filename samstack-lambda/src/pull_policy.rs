//! When to pull an image before running a container

/// Images built locally from function layers carry this prefix and exist in
/// no registry.
pub const LOCAL_IMAGE_PREFIX: &str = "samstack/lambda";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImagePullPolicy {
    /// Reuse an image already present locally instead of refreshing it
    pub skip_pull_image: bool,
}

impl ImagePullPolicy {
    pub fn new(skip_pull_image: bool) -> Self {
        Self { skip_pull_image }
    }

    /// Locally built images are never pulled. Anything else is pulled when it
    /// is missing, or when present and refreshing was not turned off.
    pub fn should_pull(&self, image: &str, is_local: bool) -> bool {
        if is_locally_built(image) {
            return false;
        }
        !is_local || !self.skip_pull_image
    }
}

pub fn is_locally_built(image: &str) -> bool {
    image.starts_with(LOCAL_IMAGE_PREFIX)
}
