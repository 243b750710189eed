// Shipscreen Infrastructure - Provider HTTP Adapter
// Implements: SanctionsSource, InspectionsSource, MovementsSource

mod client;

pub use client::{HttpProviderClient, ProviderSettings};
