//! Bank layout conventions.
//!
//! Word offsets are relative to a bank's link, using the arena's link view
//! (`lq`) for structural links and the data views (`iq`/`q`) for payload.
//! Every chain is singly linked through `lq(+0)`; a zero link terminates
//! it.

/// Next-sibling link of every chained bank.
pub const NEXT_LINK: i32 = 0;

/// Top-bank child link to the first vertex bank.
pub const TOP_VERTEX_CHAIN: i32 = 1;
/// Top-bank child link to the first reconstructed-particle bank.
pub const TOP_PARTICLE_CHAIN: i32 = 2;
/// Top-bank child link to the first simulated-particle bank.
pub const TOP_SIM_CHAIN: i32 = 3;

/// Status word carried by vertex and particle banks.
pub const STATUS_WORD: i32 = 0;
/// Status bit 0: placeholder record, contributes no output row.
pub const STATUS_DUMMY: i32 = 0x1;
/// Status bit 1: secondary vertex (primary flag is its negation).
pub const STATUS_SECONDARY: i32 = 0x2;

// Vertex bank payload.
pub const VERTEX_NDF: i32 = 3;
pub const VERTEX_POSITION: i32 = 5;
pub const VERTEX_CHI2: i32 = 8;
pub const VERTEX_COV: i32 = 9;
/// Link to the first outgoing particle bank.
pub const VERTEX_FIRST_OUT_LINK: i32 = 1;
/// Number of consecutive outgoing particles on the particle chain.
pub const VERTEX_OUT_COUNT: i32 = 2;
/// Link to the incoming particle bank (zero = none).
pub const VERTEX_INCOMING_LINK: i32 = 2;

// Reconstructed-particle bank payload.
pub const PARTICLE_MOMENTUM: i32 = 1;
pub const PARTICLE_ENERGY: i32 = 4;
pub const PARTICLE_MASS: i32 = 5;
pub const PARTICLE_CHARGE: i32 = 7;
pub const PARTICLE_TYPE: i32 = 8;

// Simulated-particle bank payload.
pub const SIM_MOMENTUM: i32 = 1;
/// Word whose low 7 bits carry the blocklet signature (see `fixup`).
pub const SIM_SIGNATURE_WORD: i32 = 4;
pub const SIM_MASS: i32 = 5;
pub const SIM_CHARGE: i32 = 7;
pub const SIM_PDG: i32 = 8;
/// Link to the production vertex bank (zero = none).
pub const SIM_PROD_VERTEX_LINK: i32 = 1;
/// Link to the decay/end vertex bank (zero = none).
pub const SIM_END_VERTEX_LINK: i32 = 2;
/// Link to the matched reconstructed-particle bank (zero = none).
pub const SIM_RECO_LINK: i32 = 3;

/// Words reserved per bank by the synthetic arena builder; generous enough
/// for the largest payload above plus the link words.
pub const BANK_WORDS: usize = 24;
