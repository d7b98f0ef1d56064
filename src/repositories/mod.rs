pub mod group_repository;
pub mod memory_store;
pub mod pg_store;
pub mod post_repository;
pub mod user_repository;

pub use group_repository::GroupRepository;
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use post_repository::PostRepository;
pub use user_repository::UserRepository;

/// Everything a handler needs from persistence. Handlers hold it as
/// `Arc<dyn Store>` so the backend is picked at startup.
pub trait Store: PostRepository + UserRepository + GroupRepository {}

impl<T> Store for T where T: PostRepository + UserRepository + GroupRepository {}
