use crate::arena::Identified;
use crate::map::{BaseId, Direction, RoadId, TileSpecial};
use crate::types::{CityId, PlayerNo, TileIndex, Turn, UnitId, UnitTypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Activity {
    #[default]
    Idle,
    Pollution,
    Mine,
    Irrigate,
    Fortified,
    Sentry,
    Pillage,
    Goto,
    Explore,
    Transform,
    Fortifying,
    Fallout,
    Base,
    GenRoad,
    Convert,
}

/// What a targeted activity works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityTarget {
    #[default]
    None,
    Special(TileSpecial),
    Base(BaseId),
    Road(RoadId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Move,
    FullMp,
    BuildCity,
    Activity,
    Disband,
    BuildWonder,
    TradeRoute,
    HomeCity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitOrder {
    pub kind:     OrderKind,
    pub dir:      Option<Direction>,
    pub activity: Option<Activity>,
    pub base:     Option<BaseId>,
    pub road:     Option<RoadId>,
}

impl UnitOrder {
    pub fn new(kind: OrderKind) -> Self {
        Self { kind, dir: None, activity: None, base: None, road: None }
    }

    pub fn move_to(dir: Direction) -> Self {
        Self { dir: Some(dir), ..Self::new(OrderKind::Move) }
    }

    pub fn activity(activity: Activity) -> Self {
        Self { activity: Some(activity), ..Self::new(OrderKind::Activity) }
    }
}

pub const MAX_LEN_ROUTE: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitOrders {
    pub list:     Vec<UnitOrder>,
    pub index:    usize,
    pub repeat:   bool,
    pub vigilant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id:                  UnitId,
    pub owner:               PlayerNo,
    pub utype:               UnitTypeId,
    pub tile:                TileIndex,
    pub facing:              Direction,
    pub homecity:            Option<CityId>,
    pub moves_left:          i32,
    pub fuel:                i32,
    pub hp:                  i32,
    pub veteran:             i32,
    pub activity:            Activity,
    pub activity_count:      i32,
    pub activity_target:     ActivityTarget,
    pub changed_from:        Activity,
    pub changed_from_count:  i32,
    pub changed_from_target: ActivityTarget,
    pub done_moving:         bool,
    pub moved:               bool,
    pub paradropped:         bool,
    pub born:                Turn,
    pub battlegroup:         i32,
    pub goto_tile:           Option<TileIndex>,
    pub ai_controlled:       bool,
    pub transported_by:      Option<UnitId>,
    pub orders:              Option<UnitOrders>,
    /// Position in the tile stack when saved.
    pub ord_map:             i32,
    /// Position in the home city's support list when saved.
    pub ord_city:            i32,
}

impl Identified for Unit {
    fn id(&self) -> UnitId {
        self.id
    }
}

impl Unit {
    pub fn new(id: UnitId, owner: PlayerNo, utype: UnitTypeId, tile: TileIndex) -> Self {
        Self {
            id,
            owner,
            utype,
            tile,
            facing: Direction::South,
            homecity: None,
            moves_left: 3,
            fuel: 0,
            hp: 10,
            veteran: 0,
            activity: Activity::Idle,
            activity_count: 0,
            activity_target: ActivityTarget::None,
            changed_from: Activity::Idle,
            changed_from_count: 0,
            changed_from_target: ActivityTarget::None,
            done_moving: false,
            moved: false,
            paradropped: false,
            born: 0,
            battlegroup: -1,
            goto_tile: None,
            ai_controlled: false,
            transported_by: None,
            orders: None,
            ord_map: 0,
            ord_city: 0,
        }
    }

    pub fn has_orders(&self) -> bool {
        self.orders.as_ref().is_some_and(|o| !o.list.is_empty())
    }

    pub fn set_idle(&mut self) {
        self.activity = Activity::Idle;
        self.activity_target = ActivityTarget::None;
        self.activity_count = 0;
    }
}
