use crate::error::ImageError;

/// Resolution of a raster, `width` columns by `height` rows.
///
/// ```
/// use dynmask_image::ImageSize;
///
/// let size = ImageSize::from([1920, 1080]);
/// assert_eq!(size.num_pixels(), 1920 * 1080);
/// assert_eq!(size.to_string(), "1920x1080");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
}

impl ImageSize {
    /// `width * height`.
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from([width, height]: [usize; 2]) -> Self {
        ImageSize { width, height }
    }
}

/// A one-channel raster, pixels laid out row after row.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T> Image<T> {
    /// Wrap `data` as a raster of `size`.
    ///
    /// # Errors
    ///
    /// [`ImageError::InvalidDataLength`] unless `data` holds exactly one value
    /// per pixel.
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if data.len() != size.num_pixels() {
            return Err(ImageError::InvalidDataLength(data.len(), size.num_pixels()));
        }
        Ok(Self { size, data })
    }

    /// A raster of `size` where every pixel is `val`.
    pub fn from_size_val(size: ImageSize, val: T) -> Self
    where
        T: Clone,
    {
        Self {
            size,
            data: vec![val; size.num_pixels()],
        }
    }

    /// Resolution.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// All pixels, row after row.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All pixels, row after row, writable.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// The pixel in column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.size
            .contains(x, y)
            .then(|| &self.data[y * self.size.width + x])
    }

    /// Overwrite the pixel in column `x`, row `y`.
    ///
    /// # Errors
    ///
    /// [`ImageError::PixelIndexOutOfBounds`] outside the raster.
    pub fn set(&mut self, x: usize, y: usize, val: T) -> Result<(), ImageError> {
        if !self.size.contains(x, y) {
            return Err(ImageError::PixelIndexOutOfBounds(x, y, self.size));
        }
        self.data[y * self.size.width + x] = val;
        Ok(())
    }

    /// Row `y`, writable.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [T]> {
        let width = self.size.width;
        (y < self.size.height).then(|| &mut self.data[y * width..(y + 1) * width])
    }

    /// A raster of the same size with `f` applied per pixel.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Image<U> {
        Image {
            size: self.size,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Convert every pixel to `U`.
    ///
    /// # Errors
    ///
    /// [`ImageError::CastError`] with the first value `U` cannot represent.
    pub fn cast<U>(&self) -> Result<Image<U>, ImageError>
    where
        T: num_traits::NumCast + Copy + std::fmt::Debug,
        U: num_traits::NumCast,
    {
        let data = self
            .data
            .iter()
            .map(|&x| U::from(x).ok_or_else(|| ImageError::CastError(format!("{x:?}"))))
            .collect::<Result<Vec<U>, ImageError>>()?;
        Ok(Image {
            size: self.size,
            data,
        })
    }
}
