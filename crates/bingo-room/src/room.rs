//! Room actor: an isolated Tokio task that owns one bingo game.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Commands, countdown ticks and expiries are all
//! handled by that one task, so a room's transitions never interleave.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use bingo_draw::{DrawSequencer, generate_card};
use bingo_protocol::{Number, RoomId, RoomListEntry, ServerEvent};
use bingo_session::EventSender;
use bingo_timer::{RoomTimer, TimerConfig, TimerEvent};
use bingo_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::player::{Player, normalize_name};
use crate::registry::RegistryLink;
use crate::{ClaimRejection, GameConfig, RoomError, RoomState};

/// Command channel capacity per room.
const CHANNEL_SIZE: usize = 64;

/// Commands sent to a room actor through its channel.
///
/// Every variant carries a reply channel; the caller waits on it.
pub(crate) enum RoomCommand {
    /// Add a member.
    Join {
        connection_id: ConnectionId,
        name: String,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a member. Replies `false` for non-members.
    Leave {
        connection_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },

    /// Admin starts the game.
    Start {
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A member claims bingo.
    ShoutBingo {
        connection_id: ConnectionId,
        claimed: Vec<Number>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
}

/// Distinguishes successive rooms that reuse the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomInstance(u64);

impl RoomInstance {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

/// A snapshot of a room, published by the actor after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomInfo {
    /// The room's id.
    pub room_id: RoomId,
    /// Current lifecycle state.
    pub state: RoomState,
    /// Member names in join order.
    pub players: Vec<String>,
    /// Capacity fixed by the creator.
    pub limit: u32,
    /// Numbers drawn in the current game.
    pub drawn: usize,
    /// The admin's name. `None` only for an empty room.
    pub admin: Option<String>,
    /// Winner of the last game, until the room returns to its lobby.
    pub winner: Option<String>,
}

impl RoomInfo {
    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.players.len()
    }

    /// The room as one row of the lobby listing.
    pub fn list_entry(&self) -> RoomListEntry {
        RoomListEntry {
            id: self.room_id.clone(),
            count: self.players.len(),
            limit: self.limit,
            active: self.state.is_active(),
        }
    }
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone. The [`RoomRegistry`](crate::RoomRegistry) holds one per
/// room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    instance: RoomInstance,
    sender: mpsc::Sender<RoomCommand>,
    info: watch::Receiver<RoomInfo>,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Leave { .. } => "Leave",
            Self::Start { .. } => "Start",
            Self::ShoutBingo { .. } => "ShoutBingo",
        };
        f.write_str(name)
    }
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns which actor this handle talks to.
    pub fn instance(&self) -> RoomInstance {
        self.instance
    }

    /// `true` once the actor has stopped taking commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// The room's latest published snapshot. Never waits on the actor.
    pub fn info(&self) -> RoomInfo {
        self.info.borrow().clone()
    }

    /// Asks the room to admit a member under `name`.
    ///
    /// On success the joiner has already been sent `room_joined`.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        name: impl Into<String>,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join {
            connection_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a member. `Ok(false)` if the connection was not a member.
    pub async fn leave(&self, connection_id: ConnectionId) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Leave {
            connection_id,
            reply,
        })
        .await
    }

    /// Starts the game on behalf of the admin.
    pub async fn start(&self, connection_id: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start {
            connection_id,
            reply,
        })
        .await?
    }

    /// Submits a bingo claim. `claimed` is what the client marked.
    pub async fn shout_bingo(
        &self,
        connection_id: ConnectionId,
        claimed: Vec<Number>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ShoutBingo {
            connection_id,
            claimed,
            reply,
        })
        .await?
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    instance: RoomInstance,
    limit: u32,
    config: Arc<GameConfig>,
    state: RoomState,
    /// Join order; the first member is the admin.
    members: Vec<Player>,
    sequencer: Option<DrawSequencer>,
    drawn: HashSet<Number>,
    winner: Option<String>,
    timer: RoomTimer,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
    info_tx: watch::Sender<RoomInfo>,
    registry: RegistryLink,
}

impl RoomActor {
    /// Runs the actor loop until the last member leaves.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, limit = self.limit, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle_command(cmd).is_break() {
                        break;
                    }
                }
                event = self.timer.wait() => self.on_timer(event),
            }
        }

        self.teardown().await;
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        tracing::trace!(room_id = %self.room_id, ?cmd, "command");
        match cmd {
            RoomCommand::Join {
                connection_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(connection_id, &name, sender);
                if let Err(e) = &result {
                    tracing::debug!(room_id = %self.room_id, %connection_id, error = %e, "join rejected");
                }
                let _ = reply.send(result);
            }
            RoomCommand::Leave {
                connection_id,
                reply,
            } => {
                let _ = reply.send(self.handle_leave(connection_id));
            }
            RoomCommand::Start {
                connection_id,
                reply,
            } => {
                let _ = reply.send(self.handle_start(connection_id));
            }
            RoomCommand::ShoutBingo {
                connection_id,
                claimed,
                reply,
            } => {
                let _ = reply.send(self.handle_shout(connection_id, &claimed));
            }
        }

        if self.members.is_empty() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        name: &str,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let name = normalize_name(name)?;
        if self.members.len() >= self.limit as usize {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }
        self.ensure_lobby()?;
        if self.members.iter().any(|p| p.has_name(&name)) {
            return Err(RoomError::DuplicateName(name));
        }
        if self.is_member(connection_id) {
            return Err(RoomError::AlreadyInRoom(self.room_id.clone()));
        }

        let card = generate_card(&self.config.space, self.config.card_size, &mut self.rng)?;
        let player = Player::new(connection_id, name, card, sender);
        player.send(ServerEvent::RoomJoined {
            room_id: self.room_id.clone(),
            card: player.card.to_vec(),
            limit: self.limit,
            is_admin: self.members.is_empty(),
        });
        tracing::info!(
            room_id = %self.room_id,
            %connection_id,
            player = %player.name,
            players = self.members.len() + 1,
            "player joined"
        );
        self.members.push(player);

        self.broadcast(self.roster());
        self.publish();

        if self.config.auto_start_when_full && self.members.len() >= self.limit as usize {
            tracing::info!(room_id = %self.room_id, "room full, starting automatically");
            self.start_game();
        }
        Ok(())
    }

    fn handle_leave(&mut self, connection_id: ConnectionId) -> bool {
        let Some(index) = self
            .members
            .iter()
            .position(|p| p.connection_id == connection_id)
        else {
            return false;
        };
        let player = self.members.remove(index);

        tracing::info!(
            room_id = %self.room_id,
            %connection_id,
            player = %player.name,
            players = self.members.len(),
            state = %self.state,
            "player left"
        );
        if index == 0 {
            if let Some(admin) = self.members.first() {
                tracing::info!(room_id = %self.room_id, admin = %admin.name, "admin promoted");
            }
        }

        if !self.members.is_empty() {
            self.broadcast(self.roster());
        }
        self.publish();
        true
    }

    fn handle_start(&mut self, connection_id: ConnectionId) -> Result<(), RoomError> {
        if !self.is_member(connection_id) {
            return Err(RoomError::NotInRoom(self.room_id.clone()));
        }
        if self.members.first().map(|p| p.connection_id) != Some(connection_id) {
            return Err(RoomError::NotAdmin);
        }
        self.ensure_lobby()?;
        self.start_game();
        Ok(())
    }

    fn handle_shout(
        &mut self,
        connection_id: ConnectionId,
        claimed: &[Number],
    ) -> Result<(), RoomError> {
        let Some(player) = self
            .members
            .iter()
            .find(|p| p.connection_id == connection_id)
        else {
            return Err(RoomError::NotInRoom(self.room_id.clone()));
        };

        if !self.state.accepts_claims() {
            let reason = if self.state == RoomState::GameOver {
                ClaimRejection::TooLate
            } else {
                ClaimRejection::NoGameRunning
            };
            return Err(RoomError::LateOrInvalidClaim(reason));
        }

        let never_drawn = claimed.iter().filter(|n| !self.drawn.contains(n)).count();
        if never_drawn > 0 {
            tracing::warn!(
                room_id = %self.room_id,
                %connection_id,
                player = %player.name,
                never_drawn,
                "claim marks numbers that were never drawn"
            );
        }

        if !player.card.is_covered_by(|n| self.drawn.contains(&n)) {
            tracing::debug!(
                room_id = %self.room_id,
                player = %player.name,
                marked = player.marked,
                card = player.card.len(),
                "incomplete card claimed"
            );
            return Err(RoomError::LateOrInvalidClaim(ClaimRejection::CardIncomplete));
        }

        let winner = player.name.clone();
        self.finish(Some(winner));
        Ok(())
    }

    fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { remaining, .. } => {
                let remaining_secs = remaining.as_millis().div_ceil(1000) as u64;
                self.broadcast(ServerEvent::Countdown { remaining_secs });
            }
            TimerEvent::Expired { .. } => match self.state {
                RoomState::Spinning => self.draw_next(),
                RoomState::NumberRevealed => {
                    if self.sequencer.as_ref().is_none_or(|s| s.is_exhausted()) {
                        tracing::info!(room_id = %self.room_id, drawn = self.drawn.len(), "numbers exhausted");
                        self.finish(None);
                    } else {
                        self.spin(self.config.spin_duration);
                    }
                }
                RoomState::GameOver => self.reset_to_lobby(),
                state => {
                    tracing::warn!(room_id = %self.room_id, %state, "countdown expired in unexpected state");
                }
            },
        }
    }

    fn start_game(&mut self) {
        self.transition(RoomState::Starting);
        let rng = StdRng::from_rng(&mut self.rng);
        self.sequencer = Some(DrawSequencer::new(&self.config.space, rng));
        self.drawn.clear();
        self.winner = None;
        for player in &mut self.members {
            player.marked = 0;
        }

        tracing::info!(room_id = %self.room_id, players = self.members.len(), "game started");
        self.broadcast(ServerEvent::GameStarted {});
        self.spin(self.config.pre_draw_delay);
    }

    fn spin(&mut self, duration: std::time::Duration) {
        self.transition(RoomState::Spinning);
        self.broadcast(ServerEvent::SpinningStart {});
        self.timer.start(duration);
        self.publish();
    }

    fn draw_next(&mut self) {
        let Some(sequencer) = self.sequencer.as_mut() else {
            tracing::warn!(room_id = %self.room_id, "spinning without a draw order");
            return;
        };
        let Some(number) = sequencer.next() else {
            tracing::info!(room_id = %self.room_id, drawn = self.drawn.len(), "numbers exhausted");
            self.finish(None);
            return;
        };

        self.drawn.insert(number);
        for player in &mut self.members {
            player.mark(number);
        }
        self.transition(RoomState::NumberRevealed);
        tracing::debug!(room_id = %self.room_id, number, drawn = self.drawn.len(), "number drawn");
        self.broadcast(ServerEvent::NumberDrawn { number });
        self.timer.start(self.config.reveal_pacing);
        self.publish();
    }

    fn finish(&mut self, winner: Option<String>) {
        self.timer.cancel();
        self.transition(RoomState::GameOver);
        tracing::info!(
            room_id = %self.room_id,
            winner = winner.as_deref().unwrap_or("-"),
            drawn = self.drawn.len(),
            "game over"
        );
        self.winner = winner.clone();
        self.broadcast(ServerEvent::GameOver { winner });
        self.timer.start(self.config.game_over_idle);
        self.publish();
    }

    fn reset_to_lobby(&mut self) {
        self.transition(RoomState::Lobby);
        self.sequencer = None;
        self.drawn.clear();
        self.winner = None;

        for (index, player) in self.members.iter_mut().enumerate() {
            match generate_card(&self.config.space, self.config.card_size, &mut self.rng) {
                Ok(card) => player.reissue(card),
                Err(e) => {
                    tracing::error!(room_id = %self.room_id, error = %e, "could not deal a new card");
                }
            }
            player.send(ServerEvent::RoomJoined {
                room_id: self.room_id.clone(),
                card: player.card.to_vec(),
                limit: self.limit,
                is_admin: index == 0,
            });
        }
        tracing::info!(room_id = %self.room_id, players = self.members.len(), "back to lobby");

        self.broadcast(self.roster());
        self.publish();
    }

    async fn teardown(mut self) {
        self.receiver.close();
        self.timer.cancel();
        self.publish();
        self.registry
            .remove_instance(&self.room_id, self.instance)
            .await;
        tracing::info!(room_id = %self.room_id, "room torn down");
    }

    fn transition(&mut self, to: RoomState) {
        if !self.state.can_transition_to(to) {
            tracing::warn!(room_id = %self.room_id, from = %self.state, %to, "unexpected state transition");
        }
        tracing::debug!(room_id = %self.room_id, from = %self.state, %to, "state changed");
        self.state = to;
    }

    fn ensure_lobby(&self) -> Result<(), RoomError> {
        if self.state.is_joinable() {
            Ok(())
        } else if self.state == RoomState::GameOver {
            Err(RoomError::BetweenGames(self.room_id.clone()))
        } else {
            Err(RoomError::AlreadyRunning(self.room_id.clone()))
        }
    }

    fn is_member(&self, connection_id: ConnectionId) -> bool {
        self.members.iter().any(|p| p.connection_id == connection_id)
    }

    fn roster(&self) -> ServerEvent {
        ServerEvent::UpdatePlayers {
            count: self.members.len(),
            limit: self.limit,
            players: self.members.iter().map(|p| p.name.clone()).collect(),
            admin: self.members.first().map(|p| p.name.clone()),
        }
    }

    /// Sends `event` to every current member.
    fn broadcast(&self, event: ServerEvent) {
        for player in &self.members {
            player.send(event.clone());
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            state: self.state,
            players: self.members.iter().map(|p| p.name.clone()).collect(),
            limit: self.limit,
            drawn: self.drawn.len(),
            admin: self.members.first().map(|p| p.name.clone()),
            winner: self.winner.clone(),
        }
    }

    /// Publishes a fresh snapshot and tells the registry when the lobby
    /// listing changed.
    fn publish(&mut self) {
        let info = self.info();
        let listing_changed = self.info_tx.borrow().list_entry() != info.list_entry();
        self.info_tx.send_replace(info);
        if listing_changed {
            self.registry.notify_changed();
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(
    room_id: RoomId,
    instance: RoomInstance,
    limit: u32,
    config: Arc<GameConfig>,
    registry: RegistryLink,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_SIZE);
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(instance.into_inner())),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let timer = RoomTimer::new(TimerConfig {
        tick_interval: config.countdown_interval,
    });

    let initial = RoomInfo {
        room_id: room_id.clone(),
        state: RoomState::Lobby,
        players: Vec::new(),
        limit,
        drawn: 0,
        admin: None,
        winner: None,
    };
    let (info_tx, info_rx) = watch::channel(initial);

    let actor = RoomActor {
        room_id: room_id.clone(),
        instance,
        limit,
        config,
        state: RoomState::Lobby,
        members: Vec::new(),
        sequencer: None,
        drawn: HashSet::new(),
        winner: None,
        timer,
        rng,
        receiver: rx,
        info_tx,
        registry,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        instance,
        sender: tx,
        info: info_rx,
    }
}
