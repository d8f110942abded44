use super::ids::{PlayerId, TeamId};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProfile {
    pub id: TeamId,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
    pub country: Option<String>,
    pub role: Option<String>,
}

/// Read-only identity lookups served by the team/player registry.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn team(&self, team_id: TeamId) -> Option<TeamProfile>;

    async fn player(&self, player_id: PlayerId) -> Option<PlayerProfile>;

    /// Display name of a team, falling back to its id.
    async fn team_name(&self, team_id: TeamId) -> String {
        self.team(team_id).await.map(|team| team.name).unwrap_or_else(|| team_id.to_string())
    }
}

/// Directory backed by an in-process map, filled by whoever owns the registry data.
#[derive(Default)]
pub struct StaticDirectory {
    teams: DashMap<TeamId, TeamProfile>,
    players: DashMap<PlayerId, PlayerProfile>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_team(&self, id: TeamId, name: &str, country: Option<&str>) {
        self.teams.insert(id, TeamProfile { id, name: name.to_string(), country: country.map(str::to_string) });
    }

    pub fn add_player(&self, profile: PlayerProfile) {
        self.players.insert(profile.id, profile);
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn team(&self, team_id: TeamId) -> Option<TeamProfile> {
        self.teams.get(&team_id).map(|team| team.clone())
    }

    async fn player(&self, player_id: PlayerId) -> Option<PlayerProfile> {
        self.players.get(&player_id).map(|player| player.clone())
    }
}
