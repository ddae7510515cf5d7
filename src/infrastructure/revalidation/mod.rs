mod broadcast_revalidator;

pub use broadcast_revalidator::BroadcastRevalidator;
