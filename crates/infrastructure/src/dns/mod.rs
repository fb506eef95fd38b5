mod precached_resolver;

pub use precached_resolver::{
    system_resolver, AddressFamily, FamilyResolution, FamilyResolve, HostResolution,
    PrecachedResolver,
};
