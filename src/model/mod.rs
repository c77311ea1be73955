// MODEL: Observer pose and scene description
pub mod camera;
pub mod scene;

pub use camera::{Camera, ObserverPose};
pub use scene::SceneManifest;
