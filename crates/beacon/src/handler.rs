//! Per-connection handler: decode requests, call the presence service,
//! send replies.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. Requests on one connection are answered in
//! order; a failed request never closes the connection.

use std::sync::Arc;

use beacon_presence::{Clock, PresenceError, PresenceService};
use beacon_protocol::{Codec, Operation, Reply, ReplyBody, Request};
use beacon_store::{RecordStore, RoomDirectory};
use beacon_transport::{Connection, WebSocketConnection};

use crate::BeaconError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), BeaconError>
where
    S: RecordStore + RoomDirectory,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let reply = match state.codec.decode::<Request>(&data) {
            Ok(request) => dispatch(&*state.service, request).await,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                Reply::error(0, 400, "Invalid data")
            }
        };

        let bytes = state.codec.encode(&reply)?;
        conn.send(&bytes).await?;
    }

    Ok(())
}

/// Runs one request against the service and builds its reply.
///
/// Failures become error replies with the code from
/// [`PresenceError::status_code`]; the detailed cause is logged, and only
/// a short public message goes back to the client.
pub async fn dispatch<S, C>(service: &PresenceService<S, C>, request: Request) -> Reply
where
    S: RecordStore + RoomDirectory,
    C: Clock,
{
    let seq = request.seq;
    let op = request.op.name();

    let result = match request.op {
        Operation::Heartbeat { room_id, player_id } => service
            .heartbeat(&room_id, &player_id)
            .await
            .map(|()| Reply::ack(seq, "Heartbeat received")),
        Operation::CreatePlayer { room_id, player_id } => service
            .create_player(&room_id, &player_id)
            .await
            .map(|_| Reply::ack(seq, "Player created")),
        Operation::GetPlayer { room_id, player_id } => service
            .get_player(&room_id, &player_id)
            .await
            .map(|player| Reply::ok(seq, ReplyBody::Player { player })),
        Operation::SetPlayerData {
            room_id,
            player_id,
            data,
        } => match data {
            Some(data) if !data.is_null() => service
                .set_player_data(&room_id, &player_id, data)
                .await
                .map(|()| Reply::ack(seq, "Player data updated")),
            _ => Err(PresenceError::InvalidInput("missing data".into())),
        },
        Operation::DeletePlayer { room_id, player_id } => service
            .delete_player(&room_id, &player_id)
            .await
            .map(|()| Reply::ack(seq, "Player deleted")),
        Operation::CreateRoom { room_id } => service
            .create_room(&room_id)
            .await
            .map(|()| Reply::ack(seq, "Room created")),
        Operation::ListRoomPlayers { room_id } => service
            .list_room_players(&room_id)
            .await
            .map(|players| Reply::ok(seq, ReplyBody::Players { players })),
        Operation::ListRooms => service
            .list_rooms()
            .await
            .map(|rooms| Reply::ok(seq, ReplyBody::Rooms { rooms })),
        Operation::ListRoomFiles { room_id } => service
            .list_room_files(&room_id)
            .await
            .map(|files| Reply::ok(seq, ReplyBody::Files { files })),
    };

    result.unwrap_or_else(|e| {
        let code = e.status_code();
        if code >= 500 {
            tracing::warn!(op, error = %e, "request failed");
        } else {
            tracing::debug!(op, error = %e, "request rejected");
        }
        Reply::error(seq, code, e.public_message())
    })
}
