pub mod connection;
pub mod memory;
pub mod monitor;
pub mod options;
pub mod plant_store;

pub use connection::{connect, DbHandle};
pub use memory::MemoryPlantStore;
pub use monitor::{ConnectionMonitor, ConnectionState};
pub use options::ConnectionOptions;
pub use plant_store::{MongoPlantStore, PlantStore, StoreStatus};
