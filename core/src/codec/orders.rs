//! Character alphabets for unit orders, directions and activities.
//!
//! A unit's orders are saved as parallel strings with one character per
//! order: `orders_list`, `dir_list`, `activity_list`, `base_list`,
//! `road_list`. `?` marks "not applicable" in every list.

use crate::map::Direction;
use crate::unit::{Activity, OrderKind};

pub const NOT_APPLICABLE: char = '?';

pub fn order2char(kind: OrderKind) -> char {
    match kind {
        OrderKind::Move => 'm',
        OrderKind::FullMp => 'w',
        OrderKind::Activity => 'a',
        OrderKind::BuildCity => 'b',
        OrderKind::Disband => 'd',
        OrderKind::BuildWonder => 'u',
        OrderKind::TradeRoute => 't',
        OrderKind::HomeCity => 'h',
    }
}

/// Upper case is accepted as well.
pub fn char2order(ch: char) -> Option<OrderKind> {
    Some(match ch.to_ascii_lowercase() {
        'm' => OrderKind::Move,
        'w' => OrderKind::FullMp,
        'a' => OrderKind::Activity,
        'b' => OrderKind::BuildCity,
        'd' => OrderKind::Disband,
        'u' => OrderKind::BuildWonder,
        't' => OrderKind::TradeRoute,
        'h' => OrderKind::HomeCity,
        _ => return None,
    })
}

/// Numeric keypad layout: 8 is north, 6 is east.
pub fn dir2char(dir: Direction) -> char {
    match dir {
        Direction::North => '8',
        Direction::South => '2',
        Direction::East => '6',
        Direction::West => '4',
        Direction::NorthEast => '9',
        Direction::NorthWest => '7',
        Direction::SouthEast => '3',
        Direction::SouthWest => '1',
    }
}

pub fn char2dir(ch: char) -> Option<Direction> {
    Some(match ch {
        '8' => Direction::North,
        '2' => Direction::South,
        '6' => Direction::East,
        '4' => Direction::West,
        '9' => Direction::NorthEast,
        '7' => Direction::NorthWest,
        '3' => Direction::SouthEast,
        '1' => Direction::SouthWest,
        _ => return None,
    })
}

pub fn activity2char(activity: Activity) -> char {
    match activity {
        Activity::Idle => 'n',
        Activity::Pollution => 'p',
        Activity::Mine => 'm',
        Activity::Irrigate => 'i',
        Activity::Fortified => 'f',
        Activity::Sentry => 'w',
        Activity::Pillage => 'e',
        Activity::Goto => 'g',
        Activity::Explore => 'x',
        Activity::Transform => 'o',
        Activity::Fortifying => 'y',
        Activity::Fallout => 'u',
        Activity::Base => 'b',
        Activity::GenRoad => 'R',
        Activity::Convert => 'c',
    }
}

/// A decoded activity character.
///
/// The legacy codes predate generic bases and roads; they only appear in
/// old files and are never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityCode {
    Current(Activity),
    /// `?`: no activity, or the long-gone patrol activity.
    Unknown,
    LegacyRoad,
    LegacyRailroad,
    LegacyFortress,
    LegacyAirbase,
}

pub fn char2activity(ch: char) -> Option<ActivityCode> {
    const CURRENT: [Activity; 15] = [
        Activity::Idle,
        Activity::Pollution,
        Activity::Mine,
        Activity::Irrigate,
        Activity::Fortified,
        Activity::Sentry,
        Activity::Pillage,
        Activity::Goto,
        Activity::Explore,
        Activity::Transform,
        Activity::Fortifying,
        Activity::Fallout,
        Activity::Base,
        Activity::GenRoad,
        Activity::Convert,
    ];
    if let Some(a) = CURRENT.into_iter().find(|&a| activity2char(a) == ch) {
        return Some(ActivityCode::Current(a));
    }
    Some(match ch {
        NOT_APPLICABLE => ActivityCode::Unknown,
        'r' => ActivityCode::LegacyRoad,
        'l' => ActivityCode::LegacyRailroad,
        't' => ActivityCode::LegacyFortress,
        'a' => ActivityCode::LegacyAirbase,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_direction_has_a_distinct_char() {
        for dir in Direction::ALL {
            assert_eq!(char2dir(dir2char(dir)), Some(dir));
        }
        assert_eq!(char2dir('5'), None);
        assert_eq!(char2dir(NOT_APPLICABLE), None);
    }

    #[test]
    fn activity_alphabet_is_unambiguous() {
        assert_eq!(char2activity('w'), Some(ActivityCode::Current(Activity::Sentry)));
        assert_eq!(char2activity('R'), Some(ActivityCode::Current(Activity::GenRoad)));
        assert_eq!(char2activity('r'), Some(ActivityCode::LegacyRoad));
        assert_eq!(char2activity('?'), Some(ActivityCode::Unknown));
        assert_eq!(char2activity('Z'), None);
    }
}
