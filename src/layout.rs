//! Tensor memory layouts and traversal classification
//!
//! A kernel never branches on [`TensorFormat`] directly: it first reduces
//! `(channels, spatial, format)` to a [`Traversal`], which folds degenerate
//! shapes into the simpler order.

/// Physical layout of a `[channels, spatial]` tensor
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TensorFormat {
    /// NCHW: all spatial positions of one channel are contiguous
    ChannelMajor,
    /// NHWC: all channels of one position are contiguous
    SpatialMajor,
    /// NCHW4c: packs of 4 channels, each pack spatial-minor
    ChannelPacked4,
    /// NCHW8c: packs of 8 channels, each pack spatial-minor
    ChannelPacked8,
    /// NCHW16c: packs of 16 channels, each pack spatial-minor
    ChannelPacked16,
}

impl TensorFormat {
    /// Channels per pack for packed formats
    #[inline]
    pub const fn pack(self) -> Option<usize> {
        match self {
            Self::ChannelPacked4 => Some(4),
            Self::ChannelPacked8 => Some(8),
            Self::ChannelPacked16 => Some(16),
            Self::ChannelMajor | Self::SpatialMajor => None,
        }
    }

    /// Returns true if `channels` can be stored in this format
    #[inline]
    pub const fn holds(self, channels: usize) -> bool {
        match self.pack() {
            Some(n) => channels % n == 0,
            None => true,
        }
    }
}

/// Loop order a kernel uses over a `[channels, spatial]` tensor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// One row of `spatial` floats per channel; parameters broadcast per row
    ChannelMajor,
    /// One row of `channels` floats per position; parameters loaded per chunk
    SpatialMajor,
    /// Packs of `n` channels, `n` floats per position inside a pack
    Packed(usize),
}

impl Traversal {
    /// Classify a format-tagged tensor.
    ///
    /// Degenerate shapes use the order with the longer contiguous rows:
    /// a single-channel NHWC tensor is one channel-major row, a
    /// single-position NCHW tensor is one spatial-major row, and a
    /// single-position packed tensor is one spatial-major row of all
    /// channels.
    #[inline]
    pub const fn classify(channels: usize, spatial: usize, format: TensorFormat) -> Self {
        match format {
            TensorFormat::ChannelMajor if spatial == 1 && channels != 1 => Self::SpatialMajor,
            TensorFormat::ChannelMajor => Self::ChannelMajor,
            TensorFormat::SpatialMajor if channels == 1 => Self::ChannelMajor,
            TensorFormat::SpatialMajor => Self::SpatialMajor,
            TensorFormat::ChannelPacked4
            | TensorFormat::ChannelPacked8
            | TensorFormat::ChannelPacked16 => {
                if spatial == 1 {
                    Self::SpatialMajor
                } else {
                    match format.pack() {
                        Some(n) => Self::Packed(n),
                        None => Self::ChannelMajor,
                    }
                }
            }
        }
    }

    /// Order for kernels flagged with `trans` (NHWC) instead of a format:
    /// spatial-major when `(trans || size == 1) && count != 1`.
    #[inline]
    pub const fn from_trans(trans: bool, count: usize, size: usize) -> Self {
        if (trans || size == 1) && count != 1 {
            Self::SpatialMajor
        } else {
            Self::ChannelMajor
        }
    }

    /// Whether a packed kernel at `width` lanes can serve this traversal
    #[inline]
    pub const fn fits_width(self, width: usize) -> bool {
        match self {
            Self::Packed(n) => n % width == 0,
            Self::ChannelMajor | Self::SpatialMajor => true,
        }
    }
}
