// SPDX-License-Identifier: Apache-2.0
//! DMSG container framing, writing, and loading.
//!
//! Layout (v6, little-endian): `"DMSG"`, version u32, endian sentinel
//! u32, ups u32, tick_index u64, seed u64, feature_epoch u32,
//! content_tlv_len u32, content TLV bytes, then chunks. Each chunk is a
//! 4-byte tag, u32 chunk version, u32 size, and `size` payload bytes.
//! Every chunk listed in [`MANDATORY_CHUNKS`] must appear exactly once;
//! unknown tags reject the whole container.

use thiserror::Error;

use meridian_core::bindings::{
    BINDINGS_SCHEMA_VERSION, BINDINGS_TAG_SCHEMA_VERSION, MEDIA_TAG_BINDING, MEDIA_TAG_BODY_ID,
    MEDIA_TAG_KIND, MEDIA_TAG_PARAMS, MEDIA_TAG_PROVIDER_ID, WEATHER_TAG_BINDING,
    WEATHER_TAG_BODY_ID, WEATHER_TAG_PARAMS, WEATHER_TAG_PROVIDER_ID,
};
use meridian_core::construction::ConstructionInstance;
use meridian_core::lanes::SurfaceChunkKey;
use meridian_core::{
    fnv1a64, AeroProps, AeroState, AiFactionState, AiReasonCode, AiSchedulerConfig, CosmoTransit,
    FactionDesc, Kernel, MacroEvent, MacroEventEffect, MediaBinding, PolicyKind, ProductionRule,
    Q48, ResourceDelta, Route, ScopeKind, StationDesc, SurfaceChunks, TlvReader, TransferEntry,
    TransferRecord, WeatherBinding, FEATURE_EPOCH_CURRENT,
};

use crate::identity::{build_identity_tlv, parse_identity_tlv};
use crate::wire::Reader;

/// Container magic.
pub const DMSG_MAGIC: [u8; 4] = *b"DMSG";
/// Container version written and required by this build.
pub const DMSG_VERSION: u32 = 6;
/// Endianness sentinel.
pub const DMSG_ENDIAN: u32 = 0x0000FFFE;

const CHUNK_VERSION: u32 = 1;

const TAG_IDEN: [u8; 4] = *b"IDEN";
const TAG_CORE: [u8; 4] = *b"CORE";
const TAG_ORBT: [u8; 4] = *b"ORBT";
const TAG_SOVR: [u8; 4] = *b"SOVR";
const TAG_MEDI: [u8; 4] = *b"MEDI";
const TAG_WEAT: [u8; 4] = *b"WEAT";
const TAG_AERP: [u8; 4] = *b"AERP";
const TAG_AERS: [u8; 4] = *b"AERS";
const TAG_CNST: [u8; 4] = *b"CNST";
const TAG_STAT: [u8; 4] = *b"STAT";
const TAG_ROUT: [u8; 4] = *b"ROUT";
const TAG_TRAN: [u8; 4] = *b"TRAN";
const TAG_PROD: [u8; 4] = *b"PROD";
const TAG_MECO: [u8; 4] = *b"MECO";
const TAG_MEVT: [u8; 4] = *b"MEVT";
const TAG_FACT: [u8; 4] = *b"FACT";
const TAG_AISC: [u8; 4] = *b"AISC";
const TAG_RNG: [u8; 4] = *b"RNG ";

/// Chunks that must be present in every v6 container.
pub const MANDATORY_CHUNKS: [[u8; 4]; 18] = [
    TAG_IDEN, TAG_CORE, TAG_ORBT, TAG_SOVR, TAG_MEDI, TAG_WEAT, TAG_AERP, TAG_AERS, TAG_CNST,
    TAG_STAT, TAG_ROUT, TAG_TRAN, TAG_PROD, TAG_MECO, TAG_MEVT, TAG_FACT, TAG_AISC, TAG_RNG,
];

/// Errors surfaced by save/load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    /// Structurally malformed container or payload that violates a
    /// subsystem invariant.
    #[error("malformed save container")]
    Format,
    /// The container (or a chunk) comes from an unsupported version or
    /// feature epoch.
    #[error("save container requires migration")]
    Migration,
}

fn append_chunk(out: &mut Vec<u8>, tag: [u8; 4], payload: &[u8]) {
    out.extend_from_slice(&tag);
    out.extend_from_slice(&CHUNK_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

/// Serializes a kernel into a DMSG v6 container.
#[must_use]
pub fn write_save(kernel: &Kernel, content_tlv: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&DMSG_MAGIC);
    out.extend_from_slice(&DMSG_VERSION.to_le_bytes());
    out.extend_from_slice(&DMSG_ENDIAN.to_le_bytes());
    out.extend_from_slice(&kernel.ups().to_le_bytes());
    out.extend_from_slice(&kernel.tick_index().to_le_bytes());
    out.extend_from_slice(&kernel.seed().to_le_bytes());
    out.extend_from_slice(&kernel.feature_epoch().to_le_bytes());
    out.extend_from_slice(&(content_tlv.len() as u32).to_le_bytes());
    out.extend_from_slice(content_tlv);

    let mut blob = Vec::new();
    kernel.encode_core_blob(&mut blob);
    append_chunk(&mut out, TAG_CORE, &blob);

    blob.clear();
    kernel.transit().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_ORBT, &blob);

    blob.clear();
    kernel.surface().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_SOVR, &blob);

    append_chunk(&mut out, TAG_MEDI, &kernel.bindings().encode_media_blob());
    append_chunk(&mut out, TAG_WEAT, &kernel.bindings().encode_weather_blob());

    blob.clear();
    kernel.aero().encode_props_blob(&mut blob);
    append_chunk(&mut out, TAG_AERP, &blob);

    blob.clear();
    kernel.aero().encode_states_blob(&mut blob);
    append_chunk(&mut out, TAG_AERS, &blob);

    blob.clear();
    kernel.constructions().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_CNST, &blob);

    blob.clear();
    kernel.stations().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_STAT, &blob);

    blob.clear();
    kernel.routes().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_ROUT, &blob);

    blob.clear();
    kernel.transfers().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_TRAN, &blob);

    blob.clear();
    kernel.production().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_PROD, &blob);

    blob.clear();
    kernel.economy().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_MECO, &blob);

    blob.clear();
    kernel.macro_events().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_MEVT, &blob);

    blob.clear();
    kernel.factions().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_FACT, &blob);

    blob.clear();
    kernel.ai().encode_blob(&mut blob);
    append_chunk(&mut out, TAG_AISC, &blob);

    append_chunk(&mut out, TAG_RNG, &kernel.rng_state().to_le_bytes());

    let identity = build_identity_tlv(kernel.identity(), content_tlv);
    append_chunk(&mut out, TAG_IDEN, &identity);

    out
}

struct ChunkTable<'a> {
    slices: Vec<([u8; 4], &'a [u8])>,
}

impl<'a> ChunkTable<'a> {
    fn get(&self, tag: [u8; 4]) -> Option<&'a [u8]> {
        self.slices
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, payload)| *payload)
    }
}

fn parse_chunks(data: &[u8]) -> Result<ChunkTable<'_>, SaveError> {
    let mut slices: Vec<([u8; 4], &[u8])> = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        if data.len() - offset < 12 {
            return Err(SaveError::Format);
        }
        let tag: [u8; 4] = data[offset..offset + 4]
            .try_into()
            .map_err(|_| SaveError::Format)?;
        let version = u32::from_le_bytes(
            data[offset + 4..offset + 8]
                .try_into()
                .map_err(|_| SaveError::Format)?,
        );
        let size = u32::from_le_bytes(
            data[offset + 8..offset + 12]
                .try_into()
                .map_err(|_| SaveError::Format)?,
        ) as usize;
        offset += 12;
        if size > data.len() - offset {
            return Err(SaveError::Format);
        }
        if !MANDATORY_CHUNKS.contains(&tag) {
            return Err(SaveError::Format);
        }
        if version > CHUNK_VERSION {
            return Err(SaveError::Migration);
        }
        if version != CHUNK_VERSION {
            return Err(SaveError::Format);
        }
        if slices.iter().any(|(t, _)| *t == tag) {
            return Err(SaveError::Format);
        }
        slices.push((tag, &data[offset..offset + size]));
        offset += size;
    }
    Ok(ChunkTable { slices })
}

fn apply_stations(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.stations_mut().reset();
    let mut last_id = 0u64;
    for _ in 0..count {
        let station_id = r.u64().ok_or(SaveError::Format)?;
        let body_id = r.u64().ok_or(SaveError::Format)?;
        let frame_id = r.u64().ok_or(SaveError::Format)?;
        let inv_count = r.u32().ok_or(SaveError::Format)?;
        if station_id == 0 || station_id <= last_id {
            return Err(SaveError::Format);
        }
        kernel
            .stations_mut()
            .register(StationDesc {
                station_id,
                body_id,
                frame_id,
            })
            .map_err(|_| SaveError::Format)?;
        for _ in 0..inv_count {
            let resource_id = r.u64().ok_or(SaveError::Format)?;
            let quantity = r.i64().ok_or(SaveError::Format)?;
            if resource_id == 0 || quantity <= 0 {
                return Err(SaveError::Format);
            }
            kernel
                .stations_mut()
                .inventory_add(station_id, resource_id, quantity)
                .map_err(|_| SaveError::Format)?;
        }
        last_id = station_id;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    Ok(())
}

fn apply_routes(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.routes_mut().reset();
    let mut last_id = 0u64;
    for _ in 0..count {
        let route = Route {
            route_id: r.u64().ok_or(SaveError::Format)?,
            src_station_id: r.u64().ok_or(SaveError::Format)?,
            dst_station_id: r.u64().ok_or(SaveError::Format)?,
            duration_ticks: r.u64().ok_or(SaveError::Format)?,
            capacity_units: r.u64().ok_or(SaveError::Format)?,
        };
        if route.route_id <= last_id {
            return Err(SaveError::Format);
        }
        kernel
            .routes_mut()
            .register(route)
            .map_err(|_| SaveError::Format)?;
        last_id = route.route_id;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    Ok(())
}

fn apply_transfers(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let current_tick = kernel.tick_index();
    let mut r = Reader::new(blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.transfers_mut().reset();
    let mut last_id = 0u64;
    for _ in 0..count {
        let transfer_id = r.u64().ok_or(SaveError::Format)?;
        let route_id = r.u64().ok_or(SaveError::Format)?;
        let start_tick = r.u64().ok_or(SaveError::Format)?;
        let arrival_tick = r.u64().ok_or(SaveError::Format)?;
        let entry_count = r.u32().ok_or(SaveError::Format)?;
        if transfer_id == 0 || transfer_id <= last_id || entry_count == 0 {
            return Err(SaveError::Format);
        }
        if arrival_tick <= current_tick {
            return Err(SaveError::Format);
        }
        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut total_units: u64 = 0;
        for _ in 0..entry_count {
            let resource_id = r.u64().ok_or(SaveError::Format)?;
            let quantity = r.i64().ok_or(SaveError::Format)?;
            if resource_id == 0 || quantity <= 0 {
                return Err(SaveError::Format);
            }
            total_units = total_units
                .checked_add(quantity as u64)
                .ok_or(SaveError::Format)?;
            entries.push(TransferEntry {
                resource_id,
                quantity,
            });
        }
        let record = TransferRecord {
            transfer_id,
            route_id,
            start_tick,
            arrival_tick,
            entries,
            total_units,
        };
        kernel.load_transfer(record).map_err(|_| SaveError::Format)?;
        last_id = transfer_id;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    Ok(())
}

fn apply_production(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let last_tick = r.u64().ok_or(SaveError::Format)?;
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.production_mut().reset();
    let mut last_id = 0u64;
    for _ in 0..count {
        let rule = ProductionRule {
            rule_id: r.u64().ok_or(SaveError::Format)?,
            station_id: r.u64().ok_or(SaveError::Format)?,
            resource_id: r.u64().ok_or(SaveError::Format)?,
            delta_per_period: r.i64().ok_or(SaveError::Format)?,
            period_ticks: r.u64().ok_or(SaveError::Format)?,
        };
        if rule.rule_id <= last_id {
            return Err(SaveError::Format);
        }
        kernel
            .production_mut()
            .register(rule)
            .map_err(|_| SaveError::Format)?;
        last_id = rule.rule_id;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    kernel.production_mut().set_last_tick(last_tick);
    Ok(())
}

fn apply_economy(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.economy_mut().reset();
    for _ in 0..count {
        let kind = ScopeKind::from_code(r.u32().ok_or(SaveError::Format)?)
            .ok_or(SaveError::Format)?;
        let scope_id = r.u64().ok_or(SaveError::Format)?;
        let flags = r.u32().ok_or(SaveError::Format)?;
        let prod_count = r.u32().ok_or(SaveError::Format)?;
        let demand_count = r.u32().ok_or(SaveError::Format)?;
        let stock_count = r.u32().ok_or(SaveError::Format)?;
        kernel
            .economy_mut()
            .register(kind, scope_id)
            .map_err(|_| SaveError::Format)?;
        for _ in 0..prod_count {
            let resource_id = r.u64().ok_or(SaveError::Format)?;
            let amount = r.i64().ok_or(SaveError::Format)?;
            if resource_id == 0 || amount == 0 {
                return Err(SaveError::Format);
            }
            kernel
                .economy_mut()
                .rate_set(kind, scope_id, resource_id, amount, 0)
                .map_err(|_| SaveError::Format)?;
        }
        for _ in 0..demand_count {
            let resource_id = r.u64().ok_or(SaveError::Format)?;
            let amount = r.i64().ok_or(SaveError::Format)?;
            if resource_id == 0 || amount == 0 {
                return Err(SaveError::Format);
            }
            let (production, _) = kernel
                .economy_mut()
                .rate_get(kind, scope_id, resource_id)
                .map_err(|_| SaveError::Format)?;
            kernel
                .economy_mut()
                .rate_set(kind, scope_id, resource_id, production, amount)
                .map_err(|_| SaveError::Format)?;
        }
        for _ in 0..stock_count {
            let resource_id = r.u64().ok_or(SaveError::Format)?;
            let quantity = r.i64().ok_or(SaveError::Format)?;
            if resource_id == 0 || quantity == 0 {
                return Err(SaveError::Format);
            }
            kernel
                .economy_mut()
                .stockpile_set(kind, scope_id, resource_id, quantity)
                .map_err(|_| SaveError::Format)?;
        }
        kernel
            .economy_mut()
            .flags_apply(kind, scope_id, flags, 0)
            .map_err(|_| SaveError::Format)?;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    Ok(())
}

fn apply_macro_events(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let last_tick = r.u64().ok_or(SaveError::Format)?;
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.macro_events_mut().reset();
    for _ in 0..count {
        let event_id = r.u64().ok_or(SaveError::Format)?;
        let scope_kind = ScopeKind::from_code(r.u32().ok_or(SaveError::Format)?)
            .ok_or(SaveError::Format)?;
        let scope_id = r.u64().ok_or(SaveError::Format)?;
        let trigger_tick = r.u64().ok_or(SaveError::Format)?;
        let effect_count = r.u32().ok_or(SaveError::Format)?;
        let mut effects = Vec::with_capacity(effect_count as usize);
        for _ in 0..effect_count {
            let effect = MacroEventEffect {
                resource_id: r.u64().ok_or(SaveError::Format)?,
                production_delta: r.i64().ok_or(SaveError::Format)?,
                demand_delta: r.i64().ok_or(SaveError::Format)?,
                flags_set: r.u32().ok_or(SaveError::Format)?,
                flags_clear: r.u32().ok_or(SaveError::Format)?,
            };
            if effect.resource_id == 0 {
                return Err(SaveError::Format);
            }
            effects.push(effect);
        }
        kernel
            .macro_events_mut()
            .schedule(MacroEvent {
                event_id,
                scope_kind,
                scope_id,
                trigger_tick,
                effects,
            })
            .map_err(|_| SaveError::Format)?;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    kernel.macro_events_mut().seek(last_tick);
    Ok(())
}

fn apply_factions(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    kernel.factions_mut().reset();
    for _ in 0..count {
        let faction_id = r.u64().ok_or(SaveError::Format)?;
        let home_scope_kind = ScopeKind::from_code(r.u32().ok_or(SaveError::Format)?)
            .ok_or(SaveError::Format)?;
        let home_scope_id = r.u64().ok_or(SaveError::Format)?;
        let policy_kind = PolicyKind::from_code(r.u32().ok_or(SaveError::Format)?)
            .ok_or(SaveError::Format)?;
        let policy_flags = r.u32().ok_or(SaveError::Format)?;
        let ai_seed = r.u64().ok_or(SaveError::Format)?;
        let node_count = r.u32().ok_or(SaveError::Format)?;
        let resource_count = r.u32().ok_or(SaveError::Format)?;
        let mut known_nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            known_nodes.push(r.u64().ok_or(SaveError::Format)?);
        }
        kernel
            .factions_mut()
            .register(FactionDesc {
                faction_id,
                home_scope_kind,
                home_scope_id,
                policy_kind,
                policy_flags,
                ai_seed,
                known_nodes,
            })
            .map_err(|_| SaveError::Format)?;
        let mut deltas = Vec::with_capacity(resource_count as usize);
        for _ in 0..resource_count {
            let resource_id = r.u64().ok_or(SaveError::Format)?;
            let quantity = r.i64().ok_or(SaveError::Format)?;
            if resource_id == 0 || quantity <= 0 {
                return Err(SaveError::Format);
            }
            deltas.push(ResourceDelta {
                resource_id,
                delta: quantity,
            });
        }
        kernel
            .factions_mut()
            .update_resources(faction_id, &deltas)
            .map_err(|_| SaveError::Format)?;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    Ok(())
}

fn apply_ai(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let config = AiSchedulerConfig {
        period_ticks: r.u32().ok_or(SaveError::Format)?,
        max_ops_per_tick: r.u32().ok_or(SaveError::Format)?,
        max_factions_per_tick: r.u32().ok_or(SaveError::Format)?,
        enable_traces: match r.u32().ok_or(SaveError::Format)? {
            0 => false,
            1 => true,
            _ => return Err(SaveError::Format),
        },
    };
    let count = r.u32().ok_or(SaveError::Format)?;
    let mut states = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let faction_id = r.u64().ok_or(SaveError::Format)?;
        let next_decision_tick = r.u64().ok_or(SaveError::Format)?;
        let last_plan_id = r.u64().ok_or(SaveError::Format)?;
        let last_output_count = r.u32().ok_or(SaveError::Format)?;
        let last_reason_code = AiReasonCode::from_code(r.u32().ok_or(SaveError::Format)?)
            .ok_or(SaveError::Format)?;
        let last_budget_hit = match r.u32().ok_or(SaveError::Format)? {
            0 => false,
            1 => true,
            _ => return Err(SaveError::Format),
        };
        if faction_id == 0 {
            return Err(SaveError::Format);
        }
        states.push(AiFactionState {
            faction_id,
            next_decision_tick,
            last_plan_id,
            last_output_count,
            last_reason_code,
            last_budget_hit,
        });
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    kernel.ai_mut().load_config(config);
    kernel.ai_mut().load_states(&states);
    Ok(())
}

fn apply_construction(kernel: &mut Kernel, blob: &[u8]) -> Result<(), SaveError> {
    let mut r = Reader::new(blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    if r.remaining() != count as usize * 68 {
        return Err(SaveError::Format);
    }
    kernel.constructions_mut().reset();
    let mut last_id = 0u64;
    for _ in 0..count {
        let instance_id = r.u64().ok_or(SaveError::Format)?;
        let type_id = r.u32().ok_or(SaveError::Format)?;
        let orientation = r.u32().ok_or(SaveError::Format)?;
        let body_id = r.u64().ok_or(SaveError::Format)?;
        let step_turns_q16 = r.i32().ok_or(SaveError::Format)?;
        let lat_index = r.i32().ok_or(SaveError::Format)?;
        let lon_index = r.i32().ok_or(SaveError::Format)?;
        let local_e = r.i64().ok_or(SaveError::Format)?;
        let local_n = r.i64().ok_or(SaveError::Format)?;
        let local_u = r.i64().ok_or(SaveError::Format)?;
        let cell_x = r.i32().ok_or(SaveError::Format)?;
        let cell_y = r.i32().ok_or(SaveError::Format)?;
        if instance_id <= last_id {
            return Err(SaveError::Format);
        }
        kernel
            .constructions_mut()
            .register(ConstructionInstance {
                instance_id,
                type_id,
                orientation,
                body_id,
                chunk_key: SurfaceChunkKey {
                    body_id,
                    step_turns_q16,
                    lat_index,
                    lon_index,
                },
                local_pos_m: [
                    Q48::from_raw(local_e),
                    Q48::from_raw(local_n),
                    Q48::from_raw(local_u),
                ],
                cell_x,
                cell_y,
            })
            .map_err(|_| SaveError::Format)?;
        last_id = instance_id;
    }
    Ok(())
}

fn apply_aero(kernel: &mut Kernel, props_blob: &[u8], states_blob: &[u8]) -> Result<(), SaveError> {
    kernel.aero_mut().reset();
    let mut r = Reader::new(props_blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    for _ in 0..count {
        let props = AeroProps {
            vessel_id: r.u64().ok_or(SaveError::Format)?,
            drag_coeff_q16: r.i32().ok_or(SaveError::Format)?,
            ref_area_q16: r.i32().ok_or(SaveError::Format)?,
            mass_kg: r.u32().ok_or(SaveError::Format)?,
            max_heat_w: r.u32().ok_or(SaveError::Format)?,
            has_max_heat: match r.u32().ok_or(SaveError::Format)? {
                0 => false,
                1 => true,
                _ => return Err(SaveError::Format),
            },
        };
        kernel
            .aero_mut()
            .register_props(props)
            .map_err(|_| SaveError::Format)?;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }

    let mut r = Reader::new(states_blob);
    let count = r.u32().ok_or(SaveError::Format)?;
    for _ in 0..count {
        let state = AeroState {
            vessel_id: r.u64().ok_or(SaveError::Format)?,
            airspeed_q16: r.i32().ok_or(SaveError::Format)?,
            heat_w: r.u32().ok_or(SaveError::Format)?,
            flags: r.u32().ok_or(SaveError::Format)?,
        };
        kernel
            .aero_mut()
            .register_state(state)
            .map_err(|_| SaveError::Format)?;
    }
    if !r.is_done() {
        return Err(SaveError::Format);
    }
    Ok(())
}

fn parse_binding_fields(payload: &[u8]) -> Result<Vec<(u32, Vec<u8>)>, SaveError> {
    let mut fields = Vec::new();
    let mut reader = TlvReader::new(payload);
    loop {
        match reader.next_record() {
            Ok(Some(record)) => fields.push((record.tag, record.payload.to_vec())),
            Ok(None) => break,
            Err(_) => return Err(SaveError::Format),
        }
    }
    Ok(fields)
}

fn apply_bindings(kernel: &mut Kernel, media_blob: &[u8], weather_blob: &[u8]) -> Result<(), SaveError> {
    kernel.bindings_mut().reset();

    for (blob, is_media) in [(media_blob, true), (weather_blob, false)] {
        let mut reader = TlvReader::new(blob);
        let first = reader
            .next_record()
            .map_err(|_| SaveError::Format)?
            .ok_or(SaveError::Format)?;
        if first.tag != BINDINGS_TAG_SCHEMA_VERSION
            || first.as_u32().map_err(|_| SaveError::Format)? != BINDINGS_SCHEMA_VERSION
        {
            return Err(SaveError::Format);
        }
        loop {
            let record = match reader.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(_) => return Err(SaveError::Format),
            };
            let expected_tag = if is_media {
                MEDIA_TAG_BINDING
            } else {
                WEATHER_TAG_BINDING
            };
            if record.tag != expected_tag {
                return Err(SaveError::Format);
            }
            let fields = parse_binding_fields(record.payload)?;
            let field = |tag: u32| -> Option<&Vec<u8>> {
                fields.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
            };
            if is_media {
                let body_bytes = field(MEDIA_TAG_BODY_ID).ok_or(SaveError::Format)?;
                let kind_bytes = field(MEDIA_TAG_KIND).ok_or(SaveError::Format)?;
                let body_id = u64::from_le_bytes(
                    body_bytes.as_slice().try_into().map_err(|_| SaveError::Format)?,
                );
                let kind = u32::from_le_bytes(
                    kind_bytes.as_slice().try_into().map_err(|_| SaveError::Format)?,
                );
                kernel
                    .bindings_mut()
                    .bind_media(MediaBinding {
                        body_id,
                        kind,
                        provider_id: field(MEDIA_TAG_PROVIDER_ID)
                            .cloned()
                            .ok_or(SaveError::Format)?,
                        params: field(MEDIA_TAG_PARAMS).cloned().unwrap_or_default(),
                    })
                    .map_err(|_| SaveError::Format)?;
            } else {
                let body_bytes = field(WEATHER_TAG_BODY_ID).ok_or(SaveError::Format)?;
                let body_id = u64::from_le_bytes(
                    body_bytes.as_slice().try_into().map_err(|_| SaveError::Format)?,
                );
                kernel
                    .bindings_mut()
                    .bind_weather(WeatherBinding {
                        body_id,
                        provider_id: field(WEATHER_TAG_PROVIDER_ID)
                            .cloned()
                            .ok_or(SaveError::Format)?,
                        params: field(WEATHER_TAG_PARAMS).cloned().unwrap_or_default(),
                    })
                    .map_err(|_| SaveError::Format)?;
            }
        }
    }
    Ok(())
}

/// Loads a DMSG container into `kernel`.
///
/// The kernel's UPS must equal the container's; every chunk payload is
/// reapplied through normal mutation paths, so invariant violations reject
/// with [`SaveError::Format`].
pub fn load_save(data: &[u8], kernel: &mut Kernel) -> Result<(), SaveError> {
    if data.len() < 40 {
        return Err(SaveError::Format);
    }
    if data[0..4] != DMSG_MAGIC {
        return Err(SaveError::Format);
    }
    let version = u32::from_le_bytes(data[4..8].try_into().map_err(|_| SaveError::Format)?);
    if version != DMSG_VERSION {
        return Err(SaveError::Migration);
    }
    let endian = u32::from_le_bytes(data[8..12].try_into().map_err(|_| SaveError::Format)?);
    if endian != DMSG_ENDIAN {
        return Err(SaveError::Format);
    }
    let ups = u32::from_le_bytes(data[12..16].try_into().map_err(|_| SaveError::Format)?);
    let tick_index = u64::from_le_bytes(data[16..24].try_into().map_err(|_| SaveError::Format)?);
    let seed = u64::from_le_bytes(data[24..32].try_into().map_err(|_| SaveError::Format)?);
    let feature_epoch =
        u32::from_le_bytes(data[32..36].try_into().map_err(|_| SaveError::Format)?);
    let content_len =
        u32::from_le_bytes(data[36..40].try_into().map_err(|_| SaveError::Format)?) as usize;

    if feature_epoch == 0 {
        return Err(SaveError::Format);
    }
    if feature_epoch > FEATURE_EPOCH_CURRENT {
        return Err(SaveError::Migration);
    }
    if ups != kernel.ups() {
        return Err(SaveError::Format);
    }
    if content_len > data.len() - 40 {
        return Err(SaveError::Format);
    }
    let content_tlv = &data[40..40 + content_len];

    let chunks = parse_chunks(&data[40 + content_len..])?;
    for tag in MANDATORY_CHUNKS {
        if chunks.get(tag).is_none() {
            return Err(SaveError::Format);
        }
    }

    // Identity first: a save bound to the wrong content set must not be
    // half-applied.
    let identity_payload = chunks.get(TAG_IDEN).ok_or(SaveError::Format)?;
    let identity = parse_identity_tlv(identity_payload).ok_or(SaveError::Format)?;
    if identity.content_hash != fnv1a64(content_tlv) {
        return Err(SaveError::Format);
    }

    kernel.restore_header(tick_index, seed, feature_epoch);

    if !kernel.apply_core_blob(chunks.get(TAG_CORE).ok_or(SaveError::Format)?) {
        return Err(SaveError::Format);
    }
    let transit = CosmoTransit::decode_blob(chunks.get(TAG_ORBT).ok_or(SaveError::Format)?)
        .ok_or(SaveError::Format)?;
    *kernel.transit_mut() = transit;
    let surface = SurfaceChunks::decode_blob(chunks.get(TAG_SOVR).ok_or(SaveError::Format)?)
        .ok_or(SaveError::Format)?;
    kernel.set_surface(surface);

    apply_bindings(
        kernel,
        chunks.get(TAG_MEDI).ok_or(SaveError::Format)?,
        chunks.get(TAG_WEAT).ok_or(SaveError::Format)?,
    )?;
    apply_aero(
        kernel,
        chunks.get(TAG_AERP).ok_or(SaveError::Format)?,
        chunks.get(TAG_AERS).ok_or(SaveError::Format)?,
    )?;
    apply_construction(kernel, chunks.get(TAG_CNST).ok_or(SaveError::Format)?)?;
    apply_stations(kernel, chunks.get(TAG_STAT).ok_or(SaveError::Format)?)?;
    apply_routes(kernel, chunks.get(TAG_ROUT).ok_or(SaveError::Format)?)?;
    apply_transfers(kernel, chunks.get(TAG_TRAN).ok_or(SaveError::Format)?)?;
    apply_production(kernel, chunks.get(TAG_PROD).ok_or(SaveError::Format)?)?;
    apply_economy(kernel, chunks.get(TAG_MECO).ok_or(SaveError::Format)?)?;
    apply_macro_events(kernel, chunks.get(TAG_MEVT).ok_or(SaveError::Format)?)?;
    apply_factions(kernel, chunks.get(TAG_FACT).ok_or(SaveError::Format)?)?;
    apply_ai(kernel, chunks.get(TAG_AISC).ok_or(SaveError::Format)?)?;

    let rng_payload = chunks.get(TAG_RNG).ok_or(SaveError::Format)?;
    if rng_payload.len() != 4 {
        return Err(SaveError::Format);
    }
    kernel.restore_rng(u32::from_le_bytes(
        rng_payload.try_into().map_err(|_| SaveError::Format)?,
    ));

    kernel.restore_identity(identity.into_session_identity());
    Ok(())
}
