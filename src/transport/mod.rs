pub mod messages;
pub mod socket;
pub mod stream;

pub use messages::{
    ClientMessage, LegacyTranscriptData, SegmentResetData, SegmentStatus, SegmentationSegment,
    ServerMessage, TranscriptEvent, TranscriptEventUpsertData, UpstreamErrorData,
};
pub use socket::{SocketConnector, SocketSink, SocketStream, WireFrame, WsConnector};
pub use stream::{ConnectionState, ConnectionStatus, ReconnectPolicy, StreamTransport};
