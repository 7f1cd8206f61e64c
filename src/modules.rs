//! Static catalog of the five dashboard modules and the widgets each offers.

use crate::error::ActivationError;
use crate::realtime::event_types;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModuleId {
    Residential,
    School,
    Hospital,
    Mine,
    Traffic,
}

impl ModuleId {
    pub const ALL: [ModuleId; 5] = [
        ModuleId::Residential,
        ModuleId::School,
        ModuleId::Hospital,
        ModuleId::Mine,
        ModuleId::Traffic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleId::Residential => "residential",
            ModuleId::School => "school",
            ModuleId::Hospital => "hospital",
            ModuleId::Mine => "mine",
            ModuleId::Traffic => "traffic",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ModuleId::Residential => "Residential Vision Dashboard",
            ModuleId::School => "School Vision Dashboard",
            ModuleId::Hospital => "Hospital Vision Dashboard",
            ModuleId::Mine => "Mine Site Vision Dashboard",
            ModuleId::Traffic => "Traffic Vision Dashboard",
        }
    }

    pub fn widgets(&self) -> &'static [WidgetDescriptor] {
        match self {
            ModuleId::Residential => RESIDENTIAL,
            ModuleId::School => SCHOOL,
            ModuleId::Hospital => HOSPITAL,
            ModuleId::Mine => MINE,
            ModuleId::Traffic => TRAFFIC,
        }
    }
}

impl FromStr for ModuleId {
    type Err = ActivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ActivationError::UnknownModule(s.to_string()))
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetKind {
    Camera,
    Analytics,
    Alert,
}

/// Where a widget's live data comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WidgetFeed {
    /// Inbound event type pushed by the server.
    pub event: Option<&'static str>,
    /// Request sent on activation and on every refresh tick.
    pub request: Option<&'static str>,
}

const NO_FEED: WidgetFeed = WidgetFeed {
    event: None,
    request: None,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetDescriptor {
    pub id: &'static str,
    pub kind: WidgetKind,
    pub title: &'static str,
    /// Permanent widgets are always shown and can never be removed.
    pub permanent: bool,
    pub feed: WidgetFeed,
}

const CAMERA_MAIN: WidgetDescriptor = WidgetDescriptor {
    id: "camera-main",
    kind: WidgetKind::Camera,
    title: "Live Camera Feed",
    permanent: true,
    feed: NO_FEED,
};

const fn widget(
    id: &'static str,
    kind: WidgetKind,
    title: &'static str,
    feed: WidgetFeed,
) -> WidgetDescriptor {
    WidgetDescriptor {
        id,
        kind,
        title,
        permanent: false,
        feed,
    }
}

const fn pushed(event: &'static str) -> WidgetFeed {
    WidgetFeed {
        event: Some(event),
        request: None,
    }
}

const fn polled(event: &'static str, request: &'static str) -> WidgetFeed {
    WidgetFeed {
        event: Some(event),
        request: Some(request),
    }
}

static RESIDENTIAL: &[WidgetDescriptor] = &[
    CAMERA_MAIN,
    widget(
        "occupancy",
        WidgetKind::Analytics,
        "Occupancy Tracking",
        polled(event_types::OCCUPANCY_UPDATE, event_types::GET_OCCUPANCY_DATA),
    ),
    widget(
        "package",
        WidgetKind::Analytics,
        "Package Detection",
        pushed(event_types::PACKAGE_DETECTION),
    ),
    widget("suspicious", WidgetKind::Alert, "Suspicious Activity Alerts", NO_FEED),
];

static SCHOOL: &[WidgetDescriptor] = &[
    CAMERA_MAIN,
    widget(
        "attendance",
        WidgetKind::Analytics,
        "Student Attendance",
        pushed(event_types::ATTENDANCE_UPDATE),
    ),
    widget("playground", WidgetKind::Analytics, "Playground Safety", NO_FEED),
    widget(
        "classroom",
        WidgetKind::Analytics,
        "Classroom Attention Analysis",
        pushed(event_types::ATTENTION_UPDATE),
    ),
];

static HOSPITAL: &[WidgetDescriptor] = &[
    CAMERA_MAIN,
    widget("fall", WidgetKind::Alert, "Patient Fall Detection", NO_FEED),
    widget("hygiene", WidgetKind::Analytics, "Hygiene Compliance", NO_FEED),
    widget("equipment", WidgetKind::Analytics, "Equipment Tracking", NO_FEED),
];

static MINE: &[WidgetDescriptor] = &[
    CAMERA_MAIN,
    widget("machinery", WidgetKind::Analytics, "Heavy Machinery Tracking", NO_FEED),
    widget("safety", WidgetKind::Alert, "Safety Gear Compliance", NO_FEED),
    widget("hazard", WidgetKind::Alert, "Hazardous Area Monitoring", NO_FEED),
];

static TRAFFIC: &[WidgetDescriptor] = &[
    CAMERA_MAIN,
    widget(
        "flow",
        WidgetKind::Analytics,
        "Traffic Flow Analysis",
        polled(event_types::TRAFFIC_UPDATE, event_types::GET_TRAFFIC_DATA),
    ),
    widget("parking", WidgetKind::Analytics, "Parking Occupancy", NO_FEED),
    widget("incidents", WidgetKind::Alert, "Public Safety Incidents", NO_FEED),
];
