//! The subset of GLFW constants that crosses the wire.
//!
//! The MCio mod feeds agent inputs straight into Minecraft's GLFW event
//! handlers, so key codes, button codes, input actions and cursor modes are
//! exchanged as raw GLFW values on both sides of the connection.

pub const RELEASE: i32 = 0;
pub const PRESS: i32 = 1;
pub const REPEAT: i32 = 2;

pub const MOUSE_BUTTON_LEFT: i32 = 0;
pub const MOUSE_BUTTON_RIGHT: i32 = 1;
pub const MOUSE_BUTTON_MIDDLE: i32 = 2;

pub const KEY_SPACE: i32 = 32;
pub const KEY_1: i32 = 49;
pub const KEY_2: i32 = 50;
pub const KEY_3: i32 = 51;
pub const KEY_4: i32 = 52;
pub const KEY_5: i32 = 53;
pub const KEY_6: i32 = 54;
pub const KEY_7: i32 = 55;
pub const KEY_8: i32 = 56;
pub const KEY_9: i32 = 57;
pub const KEY_A: i32 = 65;
pub const KEY_D: i32 = 68;
pub const KEY_E: i32 = 69;
pub const KEY_F: i32 = 70;
pub const KEY_Q: i32 = 81;
pub const KEY_S: i32 = 83;
pub const KEY_W: i32 = 87;
pub const KEY_ESCAPE: i32 = 256;
pub const KEY_F3: i32 = 292;
pub const KEY_LEFT_SHIFT: i32 = 340;
pub const KEY_LEFT_CONTROL: i32 = 341;

/// Cursor visible and free to move (0x00034001).
pub const CURSOR_NORMAL: i32 = 212993;
/// Cursor hidden and captured by the window (0x00034003).
pub const CURSOR_DISABLED: i32 = 212995;
