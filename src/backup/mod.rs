mod logic;
pub(crate) mod archive; // tar.gz creation
pub(crate) mod artifact; // per-target naming and staging
pub(crate) mod db_dump; // dump command construction
pub(crate) mod s3_upload; // object store uploads
pub(crate) mod target; // URI parsing

pub use logic::{BackupOrchestrator, RunStatus};
