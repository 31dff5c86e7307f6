/*!
 * DAISY 2.02 talking book synchronization.
 *
 * - `clip`: the `npt=<seconds>s` clip time format
 * - `sync_point`: sync points and their extraction from playback groups
 * - `loader`: the navigation/timing/text document graph of a book
 * - `synchronizer`: word level resynchronization and the batch driver
 */

pub mod clip;
pub mod loader;
pub mod sync_point;
pub mod synchronizer;

pub use loader::{DocumentSet, LoadOptions};
pub use sync_point::{extract_sync_point, SyncPoint};
pub use synchronizer::{GroupOutcome, SyncOptions, SyncReport, Synchronizer};
