//! Wire-level pieces for the wizbridge Art-Net to WiZ bulb bridge:
//! the Art-Net `ArtDmx` decoder, the WiZ `setPilot`/`getPilot` JSON
//! codec, and the shared UDP control socket they're sent over.

pub mod artnet;
pub mod codec;
pub mod error;
pub mod socket;

pub use artnet::{accepts_universe, decode_art_dmx, ArtDmxPacket, ARTNET_PORT};
pub use codec::{encode_get_pilot, encode_set_pilot, parse_get_pilot_reply, GetPilotResult, BULB_PORT};
pub use error::{NetError, Result};
pub use socket::{ControlSocket, ReplyListener};
