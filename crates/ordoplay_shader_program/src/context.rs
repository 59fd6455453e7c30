// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render context shared by shader programs and renderers.

use crate::device::{ProgramHandle, ShaderDevice};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Device plus the process-wide "currently active program" marker
pub struct RenderState<D> {
    /// Native device
    pub device: D,
    /// Program last made current through [`ShaderProgram::bind`](crate::ShaderProgram::bind)
    pub(crate) active_program: Option<ProgramHandle>,
}

impl<D> RenderState<D> {
    /// Currently active program, if any
    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.active_program
    }
}

/// Owner of the graphics device.
///
/// Compile, link, delete and dump run while holding the non-main lock, so
/// two of them never execute at once. Operations are not queued or
/// reordered; callers block until the lock is free.
pub struct RenderContext<D> {
    state: Mutex<RenderState<D>>,
}

impl<D: ShaderDevice> RenderContext<D> {
    /// Wrap a device
    pub fn new(device: D) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RenderState {
                device,
                active_program: None,
            }),
        })
    }

    /// Acquire the non-main lock for the duration of the returned guard
    pub fn lock_non_main(&self) -> MutexGuard<'_, RenderState<D>> {
        self.state.lock()
    }

    /// Currently active program, if any
    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.state.lock().active_program
    }

    /// Make no program current. Does nothing when none is active.
    pub fn unbind_program(&self) {
        let mut state = self.state.lock();
        if state.active_program.take().is_some() {
            state.device.use_program(None);
        }
    }
}

/// Source of the values behind recognized uniform semantics
pub trait AutoUniforms {
    /// `modelViewProjectionMatrix`
    fn model_view_projection(&self) -> [f32; 16];
    /// `modelViewMatrix`
    fn model_view(&self) -> [f32; 16];
    /// `projectionMatrix`
    fn projection(&self) -> [f32; 16];
    /// `normalMatrix`
    fn normal_matrix(&self) -> [f32; 9];
    /// `flatColor`
    fn flat_color(&self) -> [f32; 4];
}

/// Column-major identity matrix
pub const IDENTITY_4X4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Plain transform state, the usual [`AutoUniforms`] provider
#[derive(Debug, Clone, PartialEq)]
pub struct TransformState {
    /// Model-view matrix
    pub model_view: [f32; 16],
    /// Projection matrix
    pub projection: [f32; 16],
    /// Normal matrix
    pub normal: [f32; 9],
    /// Flat color (RGBA)
    pub color: [f32; 4],
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            model_view: IDENTITY_4X4,
            projection: IDENTITY_4X4,
            normal: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Column-major `a * b`
pub fn mul_mat4(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

impl AutoUniforms for TransformState {
    fn model_view_projection(&self) -> [f32; 16] {
        mul_mat4(&self.projection, &self.model_view)
    }

    fn model_view(&self) -> [f32; 16] {
        self.model_view
    }

    fn projection(&self) -> [f32; 16] {
        self.projection
    }

    fn normal_matrix(&self) -> [f32; 9] {
        self.normal
    }

    fn flat_color(&self) -> [f32; 4] {
        self.color
    }
}
