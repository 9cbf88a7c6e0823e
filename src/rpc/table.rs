//! Registry and dispatch table.
//!
//! Endpoints are registered into a [`Registry`] during startup. Every
//! registration is checked on the spot; the first failure aborts startup.
//! [`Registry::seal`] consumes the registry and yields an immutable
//! [`DispatchTable`], sorted by id, which the bus adapter then shares for
//! the rest of the process lifetime. Registering after sealing is not
//! expressible: the registry no longer exists.
//!
//! ```text
//!  Registry (mutable, init only) ──seal()──▶ DispatchTable (read-only)
//!     register / scope / read_only ...          resolve(id): O(log n)
//! ```

use log::info;
use postcard::ser_flavors::Flavor;

use super::codec::{ArgPack, ReturnValue, WireValue};
use super::descriptor::{
    Access, Accessors, Descriptor, EndpointId, EndpointInfo, Function, Name,
};
use crate::config::BusConfig;
use crate::error::{RegistryError, Result};

/// Default table capacity: one slot per endpoint id with the default
/// 6-bit endpoint field.
pub const DEFAULT_CAPACITY: usize = 64;

// ───────────────────────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────────────────────

/// Mutable builder for a [`DispatchTable`].
pub struct Registry<C, const N: usize = DEFAULT_CAPACITY> {
    config: BusConfig,
    entries: heapless::Vec<Descriptor<C>, N>,
    next_id: u32,
}

impl<C: 'static, const N: usize> Registry<C, N> {
    /// Start an empty registry. Fails if `config` does not validate.
    pub fn new(config: BusConfig) -> Result<Self> {
        config.validate()?;
        let next_id = u32::from(config.first_endpoint_id);
        Ok(Self {
            config,
            entries: heapless::Vec::new(),
            next_id,
        })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register an attribute under an explicit id.
    ///
    /// `wire_size` must equal the native size of `T`, and `accessors` must
    /// provide exactly the getter/setter that `access` calls for.
    pub fn register<T: WireValue + 'static>(
        &mut self,
        id: EndpointId,
        name: &str,
        access: Access,
        wire_size: usize,
        accessors: Accessors<C, T>,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let descriptor = Descriptor::attribute(id, name, access, wire_size, accessors)?;
        self.insert(descriptor)
    }

    /// Register a function under an explicit id.
    pub fn register_function<A, R>(
        &mut self,
        id: EndpointId,
        name: &str,
        function: Function<C, A, R>,
    ) -> core::result::Result<EndpointId, RegistryError>
    where
        A: ArgPack + 'static,
        R: ReturnValue + 'static,
    {
        let descriptor = Descriptor::function(id, name, function)?;
        self.insert(descriptor)
    }

    // ── Auto-assigned ids ─────────────────────────────────────

    /// Id the next auto-assigning call will use.
    pub fn next_id(&self) -> core::result::Result<EndpointId, RegistryError> {
        EndpointId::try_from(self.next_id)
            .map_err(|_| RegistryError::IdOutOfRange(self.next_id))
    }

    pub fn read_only<T: WireValue + 'static>(
        &mut self,
        name: &str,
        getter: impl Fn(&C) -> T + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let id = self.next_id()?;
        self.register(id, name, Access::ReadOnly, T::SIZE, Accessors::new().getter(getter))
    }

    pub fn write_only<T: WireValue + 'static>(
        &mut self,
        name: &str,
        setter: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let id = self.next_id()?;
        self.register(id, name, Access::WriteOnly, T::SIZE, Accessors::new().setter(setter))
    }

    pub fn read_write<T: WireValue + 'static>(
        &mut self,
        name: &str,
        getter: impl Fn(&C) -> T + Send + Sync + 'static,
        setter: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let id = self.next_id()?;
        self.register(
            id,
            name,
            Access::ReadWrite,
            T::SIZE,
            Accessors::new().getter(getter).setter(setter),
        )
    }

    pub fn function<A, R>(
        &mut self,
        name: &str,
        f: impl Fn(&mut C, A) -> R + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError>
    where
        A: ArgPack + 'static,
        R: ReturnValue + 'static,
    {
        let id = self.next_id()?;
        self.register_function(id, name, Function::new(f))
    }

    /// Enum attribute over a `u8` with an auto-assigned id.
    pub fn enumeration(
        &mut self,
        name: &str,
        access: Access,
        options: &[&str],
        accessors: Accessors<C, u8>,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let id = self.next_id()?;
        let descriptor = Descriptor::enumeration(id, name, access, options, accessors)?;
        self.insert(descriptor)
    }

    /// Bitmask attribute over a `u8` with an auto-assigned id.
    pub fn bitmask(
        &mut self,
        name: &str,
        access: Access,
        flags: &[&str],
        accessors: Accessors<C, u8>,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let id = self.next_id()?;
        let descriptor = Descriptor::bitmask(id, name, access, flags, accessors)?;
        self.insert(descriptor)
    }

    /// Attach a summary and optional unit to an already registered endpoint.
    pub fn annotate(
        &mut self,
        id: EndpointId,
        summary: &str,
        unit: Option<&str>,
    ) -> core::result::Result<(), RegistryError> {
        self.entries
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or(RegistryError::UnknownEndpoint(id))?
            .set_meta(summary, unit)
    }

    /// Register children under `prefix.` with auto-assigned ids.
    pub fn scope(&mut self, prefix: &str) -> Scope<'_, C, N> {
        let mut name = Name::new();
        let overflow = name.push_str(prefix).is_err();
        Scope {
            registry: self,
            prefix: name,
            overflow,
        }
    }

    // ── Sealing ───────────────────────────────────────────────

    /// Freeze the registry into a dispatch table.
    ///
    /// Fails only if the description cannot be encoded for hashing.
    pub fn seal(mut self) -> core::result::Result<DispatchTable<C, N>, RegistryError> {
        self.entries.sort_unstable_by_key(Descriptor::id);
        let infos: Vec<EndpointInfo> = self.entries.iter().map(Descriptor::info).collect();
        let hash = protocol_hash(&infos)?;
        info!(
            "dispatch table sealed: {} endpoints, protocol hash 0x{:08x}",
            self.entries.len(),
            hash
        );
        Ok(DispatchTable {
            config: self.config,
            entries: self.entries,
            hash,
        })
    }

    // ── Internal ──────────────────────────────────────────────

    fn insert(
        &mut self,
        descriptor: Descriptor<C>,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let id = descriptor.id();

        if u32::from(id) > self.config.max_endpoint_id() {
            return Err(RegistryError::IdOutOfRange(u32::from(id)));
        }

        let max = self.config.max_payload;
        for size in [descriptor.wire_size(), descriptor.response_size()] {
            if size > max {
                return Err(RegistryError::WireSizeTooLarge { id, size, max });
            }
        }

        for existing in &self.entries {
            if existing.id() == id {
                return Err(RegistryError::DuplicateId(id));
            }
            if existing.name() == descriptor.name() {
                return Err(RegistryError::DuplicateName(id));
            }
        }

        self.entries
            .push(descriptor)
            .map_err(|_| RegistryError::TableFull(id))?;
        self.next_id = self.next_id.max(u32::from(id) + 1);
        Ok(id)
    }
}

// ───────────────────────────────────────────────────────────────
// Scope
// ───────────────────────────────────────────────────────────────

/// A registry view that prefixes every name with `prefix.`.
pub struct Scope<'r, C, const N: usize> {
    registry: &'r mut Registry<C, N>,
    prefix: Name,
    overflow: bool,
}

impl<C: 'static, const N: usize> Scope<'_, C, N> {
    pub fn read_only<T: WireValue + 'static>(
        &mut self,
        name: &str,
        getter: impl Fn(&C) -> T + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let full = self.full_name(name)?;
        self.registry.read_only(&full, getter)
    }

    pub fn write_only<T: WireValue + 'static>(
        &mut self,
        name: &str,
        setter: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let full = self.full_name(name)?;
        self.registry.write_only(&full, setter)
    }

    pub fn read_write<T: WireValue + 'static>(
        &mut self,
        name: &str,
        getter: impl Fn(&C) -> T + Send + Sync + 'static,
        setter: impl Fn(&mut C, T) + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let full = self.full_name(name)?;
        self.registry.read_write(&full, getter, setter)
    }

    pub fn function<A, R>(
        &mut self,
        name: &str,
        f: impl Fn(&mut C, A) -> R + Send + Sync + 'static,
    ) -> core::result::Result<EndpointId, RegistryError>
    where
        A: ArgPack + 'static,
        R: ReturnValue + 'static,
    {
        let full = self.full_name(name)?;
        self.registry.function(&full, f)
    }

    pub fn enumeration(
        &mut self,
        name: &str,
        access: Access,
        options: &[&str],
        accessors: Accessors<C, u8>,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let full = self.full_name(name)?;
        self.registry.enumeration(&full, access, options, accessors)
    }

    pub fn bitmask(
        &mut self,
        name: &str,
        access: Access,
        flags: &[&str],
        accessors: Accessors<C, u8>,
    ) -> core::result::Result<EndpointId, RegistryError> {
        let full = self.full_name(name)?;
        self.registry.bitmask(&full, access, flags, accessors)
    }

    pub fn annotate(
        &mut self,
        id: EndpointId,
        summary: &str,
        unit: Option<&str>,
    ) -> core::result::Result<(), RegistryError> {
        self.registry.annotate(id, summary, unit)
    }

    /// Nested scope: `prefix.child.`
    pub fn scope(&mut self, child: &str) -> Scope<'_, C, N> {
        let mut prefix = self.prefix.clone();
        let overflow =
            self.overflow || prefix.push('.').is_err() || prefix.push_str(child).is_err();
        Scope {
            registry: &mut *self.registry,
            prefix,
            overflow,
        }
    }

    fn full_name(&self, name: &str) -> core::result::Result<Name, RegistryError> {
        let id = self.registry.next_id()?;
        let mut full = self.prefix.clone();
        if self.overflow || full.push('.').is_err() || full.push_str(name).is_err() {
            return Err(RegistryError::InvalidName(id));
        }
        Ok(full)
    }
}

// ───────────────────────────────────────────────────────────────
// DispatchTable
// ───────────────────────────────────────────────────────────────

/// Immutable id → descriptor index, built once by [`Registry::seal`].
///
/// Lookups take `&self` only, so the table can be shared with every
/// receive context without locking.
pub struct DispatchTable<C, const N: usize = DEFAULT_CAPACITY> {
    config: BusConfig,
    entries: heapless::Vec<Descriptor<C>, N>,
    hash: u32,
}

impl<C, const N: usize> DispatchTable<C, N> {
    /// Find the descriptor for `id`. Binary search over the sorted entries.
    pub fn resolve(&self, id: EndpointId) -> Option<&Descriptor<C>> {
        self.entries
            .binary_search_by_key(&id, Descriptor::id)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Find a descriptor by its dotted name. Linear; meant for tooling.
    pub fn resolve_name(&self, name: &str) -> Option<&Descriptor<C>> {
        self.entries.iter().find(|d| d.name() == name)
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor<C>> {
        self.entries.iter()
    }

    /// Summary of every endpoint, in id order.
    pub fn describe(&self) -> Vec<EndpointInfo> {
        self.entries.iter().map(Descriptor::info).collect()
    }

    /// First four bytes (little-endian) of SHA-256 over the postcard
    /// encoding of [`describe`](Self::describe). Peers compare it to detect
    /// mismatched bindings.
    pub fn protocol_hash(&self) -> u32 {
        self.hash
    }
}

/// Postcard output flavor that feeds every byte straight into SHA-256, so
/// no entry is ever bounded by a scratch buffer.
struct Sha256Flavor(hmac_sha256::Hash);

impl Flavor for Sha256Flavor {
    type Output = [u8; 32];

    fn try_extend(&mut self, data: &[u8]) -> postcard::Result<()> {
        self.0.update(data);
        Ok(())
    }

    fn try_push(&mut self, data: u8) -> postcard::Result<()> {
        self.0.update([data]);
        Ok(())
    }

    fn finalize(self) -> postcard::Result<Self::Output> {
        Ok(self.0.finalize())
    }
}

fn protocol_hash(infos: &[EndpointInfo]) -> core::result::Result<u32, RegistryError> {
    let digest = postcard::serialize_with_flavor(infos, Sha256Flavor(hmac_sha256::Hash::new()))
        .map_err(|_| RegistryError::DescriptionEncoding)?;
    Ok(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
}
