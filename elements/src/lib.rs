// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod align_error;
pub mod astro_util;
pub mod circle_fit;
pub mod horizon_trait;
pub mod horizon_transform;
pub mod polar_projection;
