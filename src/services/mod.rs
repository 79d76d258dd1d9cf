//! Services layer - Business logic
//!
//! This module contains the business logic of the Exhibitly front-end.
//! Services are responsible for:
//! - Validating forms before anything reaches the network
//! - Coordinating the backend store and the media uploader
//! - Turning backend failures into errors a page can show

pub mod dashboard;
pub mod engagement;
pub mod gallery;
pub mod profile;
pub mod session;
pub mod upload;
pub mod validation;

pub use dashboard::{DashboardError, DashboardService, DashboardTotals, DashboardView};
pub use engagement::{EngagementError, EngagementService, LikeState};
pub use gallery::{ArtworkView, GalleryItem, GalleryPage, GalleryQuery, GalleryService};
pub use profile::{ProfileError, ProfileService, ProfileView};
pub use session::{AuthEvent, Resolved, SessionError, SessionService};
pub use upload::{UploadError, UploadForm, UploadService};
pub use validation::{PasswordChecks, ValidationError};
