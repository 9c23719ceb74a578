use std::ops::{BitAndAssign, BitOrAssign};

/// Number of distinct sort-group values representable in the key.
pub const MAX_SORT_GROUPS: u32 = 1 << GROUP_BITS;

const GROUP_BITS: u32 = 7;
const ALPHA_BITS: u32 = 1;
const SHADER_BITS: u32 = 10;
const TEXTURE_BITS: u32 = 14;

const TEXTURE_SHIFT: u32 = 0;
const SHADER_SHIFT: u32 = TEXTURE_SHIFT + TEXTURE_BITS;
const ALPHA_SHIFT: u32 = SHADER_SHIFT + SHADER_BITS;
const GROUP_SHIFT: u32 = ALPHA_SHIFT + ALPHA_BITS;

pub const TEXTURE_MASK: u32 = ((1 << TEXTURE_BITS) - 1) << TEXTURE_SHIFT;
pub const SHADER_MASK: u32 = ((1 << SHADER_BITS) - 1) << SHADER_SHIFT;
pub const ALPHA_MASK: u32 = ((1 << ALPHA_BITS) - 1) << ALPHA_SHIFT;
pub const GROUP_MASK: u32 = ((1 << GROUP_BITS) - 1) << GROUP_SHIFT;

/// Ordering bucket for a draw. Values are arithmetic, not bitwise: the
/// named constants reserve bands inside the 7-bit field so callers can
/// nudge within a band with [`SortGroup::offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortGroup(u8);

impl SortGroup {
    pub const PRE_OPAQUE: Self = Self(16);
    pub const OPAQUE: Self = Self(32);
    pub const SKYBOX: Self = Self(48);
    pub const POST_OPAQUE: Self = Self(64);
    pub const PRE_ALPHA: Self = Self(80);
    pub const ALPHA_BACK: Self = Self(96);
    pub const ALPHA_FRONT: Self = Self(112);
    pub const POST_ALPHA: Self = Self(120);

    pub fn new(value: u32) -> Self {
        assert!(value < MAX_SORT_GROUPS, "sort group {value} out of range");
        Self(value as u8)
    }

    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    /// Shift within the group band, e.g. `SortGroup::OPAQUE.offset(1)` to
    /// draw just after the default opaque set.
    pub fn offset(self, delta: i32) -> Self {
        Self::new((i32::from(self.0) + delta) as u32)
    }
}

impl Default for SortGroup {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// Packed draw-ordering token.
///
/// Field layout, most significant first: sort group (7 bits), alpha flag
/// (1 bit), shader id (10 bits), texture id (14 bits). Comparing two keys
/// as plain `u32`s yields the intended draw order, which is what lets the
/// drawlist sort on a single integer compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey(u32);

impl SortKey {
    pub const fn from_value(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn group(self) -> SortGroup {
        SortGroup::new((self.0 & GROUP_MASK) >> GROUP_SHIFT)
    }

    pub fn set_group(&mut self, group: SortGroup) {
        self.0 = (self.0 & !GROUP_MASK) | (group.value() << GROUP_SHIFT);
    }

    pub fn with_group(mut self, group: SortGroup) -> Self {
        self.set_group(group);
        self
    }

    pub fn alpha(self) -> bool {
        self.0 & ALPHA_MASK != 0
    }

    pub fn set_alpha(&mut self, alpha: bool) {
        if alpha {
            self.0 |= ALPHA_MASK;
        } else {
            self.0 &= !ALPHA_MASK;
        }
    }

    pub fn shader_id(self) -> u32 {
        (self.0 & SHADER_MASK) >> SHADER_SHIFT
    }

    pub fn set_shader_id(&mut self, id: u32) {
        assert!(id < (1 << SHADER_BITS), "shader sort id {id} out of range");
        self.0 = (self.0 & !SHADER_MASK) | (id << SHADER_SHIFT);
    }

    pub fn texture_id(self) -> u32 {
        (self.0 & TEXTURE_MASK) >> TEXTURE_SHIFT
    }

    pub fn set_texture_id(&mut self, id: u32) {
        assert!(id < (1 << TEXTURE_BITS), "texture sort id {id} out of range");
        self.0 = (self.0 & !TEXTURE_MASK) | (id << TEXTURE_SHIFT);
    }
}

impl Default for SortKey {
    fn default() -> Self {
        let mut key = Self(0);
        key.set_group(SortGroup::default());
        key
    }
}

impl BitOrAssign<u32> for SortKey {
    fn bitor_assign(&mut self, rhs: u32) {
        self.0 |= rhs;
    }
}

impl BitAndAssign<u32> for SortKey {
    fn bitand_assign(&mut self, rhs: u32) {
        self.0 &= rhs;
    }
}

/// A (mask, value) pair an instance can use to force specific key fields
/// regardless of the nugget's own settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortKeyOverride {
    mask: u32,
    value: u32,
}

impl SortKeyOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: SortGroup) -> Self {
        self.mask |= GROUP_MASK;
        self.value = (self.value & !GROUP_MASK) | (group.value() << GROUP_SHIFT);
        self
    }

    pub fn with_alpha(mut self, alpha: bool) -> Self {
        self.mask |= ALPHA_MASK;
        self.value = (self.value & !ALPHA_MASK) | (u32::from(alpha) << ALPHA_SHIFT);
        self
    }

    pub fn with_shader_id(mut self, id: u32) -> Self {
        assert!(id < (1 << SHADER_BITS), "shader sort id {id} out of range");
        self.mask |= SHADER_MASK;
        self.value = (self.value & !SHADER_MASK) | (id << SHADER_SHIFT);
        self
    }

    pub fn with_texture_id(mut self, id: u32) -> Self {
        assert!(id < (1 << TEXTURE_BITS), "texture sort id {id} out of range");
        self.mask |= TEXTURE_MASK;
        self.value = (self.value & !TEXTURE_MASK) | (id << TEXTURE_SHIFT);
        self
    }

    pub fn combine(self, key: SortKey) -> SortKey {
        SortKey((key.value() & !self.mask) | (self.value & self.mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_dominates_ordering() {
        let mut low = SortKey::default().with_group(SortGroup::OPAQUE);
        low.set_shader_id((1 << SHADER_BITS) - 1);
        low.set_texture_id((1 << TEXTURE_BITS) - 1);
        low.set_alpha(true);

        let high = SortKey::default().with_group(SortGroup::SKYBOX);

        assert!(low.group() < high.group());
        assert!(low.value() < high.value());
    }

    #[test]
    fn field_roundtrip() {
        let mut key = SortKey::default();
        key.set_group(SortGroup::PRE_ALPHA);
        key.set_alpha(true);
        key.set_shader_id(0x2A5);
        key.set_texture_id(0x3FFF);

        assert_eq!(key.group(), SortGroup::PRE_ALPHA);
        assert!(key.alpha());
        assert_eq!(key.shader_id(), 0x2A5);
        assert_eq!(key.texture_id(), 0x3FFF);
    }

    #[test]
    fn named_groups_are_strictly_increasing() {
        let groups = [
            SortGroup::PRE_OPAQUE,
            SortGroup::OPAQUE,
            SortGroup::SKYBOX,
            SortGroup::POST_OPAQUE,
            SortGroup::PRE_ALPHA,
            SortGroup::ALPHA_BACK,
            SortGroup::ALPHA_FRONT,
            SortGroup::POST_ALPHA,
        ];
        for pair in groups.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_group_panics() {
        let _ = SortGroup::new(MAX_SORT_GROUPS);
    }

    #[test]
    fn override_only_touches_masked_fields() {
        let mut key = SortKey::default();
        key.set_shader_id(7);
        key.set_texture_id(99);

        let tint = SortKeyOverride::new()
            .with_group(SortGroup::ALPHA_FRONT)
            .with_alpha(true);
        let combined = tint.combine(key);

        assert_eq!(combined.group(), SortGroup::ALPHA_FRONT);
        assert!(combined.alpha());
        assert_eq!(combined.shader_id(), 7);
        assert_eq!(combined.texture_id(), 99);
    }

    #[test]
    fn override_is_idempotent() {
        let mut key = SortKey::default();
        key.set_shader_id(3);

        let ovr = SortKeyOverride::new().with_group(SortGroup::POST_ALPHA);
        let once = ovr.combine(key);
        let twice = ovr.combine(once);
        assert_eq!(once, twice);
    }
}
