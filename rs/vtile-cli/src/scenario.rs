use std::{collections::HashSet, path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Who joins the call, when, and what happens to their video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
	#[serde(default, rename = "participant")]
	pub participants: Vec<Participant>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Participant {
	/// The attendee id; omit it for the local camera.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attendee: Option<String>,

	/// The tile id the media client assigns to this feed.
	pub tile: i32,

	/// When the participant starts sending video, relative to the start of the call.
	#[serde(default, with = "humantime_serde")]
	pub join: Duration,

	/// When the participant stops sending video, if ever.
	#[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
	pub leave: Option<Duration>,

	#[serde(default, rename = "event", skip_serializing_if = "Vec::is_empty")]
	pub events: Vec<Event>,
}

/// Something that happens to a participant's feed at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
	#[serde(with = "humantime_serde")]
	pub at: Duration,
	pub action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	/// The local user stops receiving the feed.
	Pause,
	/// The local user receives the feed again.
	Resume,
	/// The network can no longer sustain the feed.
	PoorConnection,
	/// The network recovered.
	Recovered,
}

impl Scenario {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		let scenario: Self = toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
		scenario.validate()?;

		Ok(scenario)
	}

	pub fn validate(&self) -> anyhow::Result<()> {
		let mut tiles = HashSet::new();
		let mut attendees = HashSet::new();

		for participant in &self.participants {
			anyhow::ensure!(tiles.insert(participant.tile), "duplicate tile id {}", participant.tile);
			anyhow::ensure!(
				attendees.insert(participant.attendee.clone()),
				"duplicate attendee {:?}",
				participant.attendee
			);

			if let Some(leave) = participant.leave {
				anyhow::ensure!(leave > participant.join, "tile {} leaves before joining", participant.tile);
			}
		}

		Ok(())
	}
}

impl Default for Scenario {
	/// A small call: the local camera, two remote cameras and a screen share.
	fn default() -> Self {
		let secs = Duration::from_secs;

		Self {
			participants: vec![
				Participant {
					attendee: None,
					tile: 0,
					join: Duration::ZERO,
					leave: None,
					events: Vec::new(),
				},
				Participant {
					attendee: Some("alice".to_string()),
					tile: 1,
					join: Duration::ZERO,
					leave: Some(secs(8)),
					events: vec![
						Event {
							at: secs(2),
							action: Action::PoorConnection,
						},
						Event {
							at: secs(3),
							action: Action::Recovered,
						},
					],
				},
				Participant {
					attendee: Some("bob".to_string()),
					tile: 2,
					join: secs(1),
					leave: None,
					events: vec![
						Event {
							at: secs(4),
							action: Action::Pause,
						},
						Event {
							at: secs(5),
							action: Action::Resume,
						},
					],
				},
				Participant {
					attendee: Some("bob#content".to_string()),
					tile: 3,
					join: secs(2),
					leave: Some(secs(6)),
					events: Vec::new(),
				},
			],
		}
	}
}
