//! Draw submission.
//!
//! Every draw binds the given layout, submits, then clears the layout binding
//! again. The program is not touched: call [`Shader::use_program`] first.
//!
//! [`Shader::use_program`]: crate::shader::Shader::use_program

use crate::device::{DrawMode, SharedDevice};
use crate::paint::Color;

use super::VertexArray;

/// Draws `count` vertices of `layout`, starting at vertex 0.
pub fn draw_arrays(layout: &VertexArray, mode: DrawMode, count: u32) {
    draw_arrays_from(layout, mode, 0, count);
}

/// Draws `count` vertices of `layout`, starting at vertex `first`.
pub fn draw_arrays_from(layout: &VertexArray, mode: DrawMode, first: u32, count: u32) {
    let device = layout.shared_device();
    layout.bind();
    device.draw_arrays(mode, first, count);
    VertexArray::unbind(device);
}

#[inline]
pub fn draw_triangles(layout: &VertexArray, count: u32) {
    draw_arrays(layout, DrawMode::Triangles, count);
}

/// Sets the clear color and clears the frame.
pub fn clear(device: &SharedDevice, color: Color) {
    device.clear_color(color);
    device.clear();
}

/// Sets the clear color used by later [`Device::clear`] calls.
///
/// [`Device::clear`]: crate::device::Device::clear
pub fn clear_color(device: &SharedDevice, color: Color) {
    device.clear_color(color);
}
