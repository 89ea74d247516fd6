pub mod logging;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod sync;

pub mod util {
    pub mod env;
}
