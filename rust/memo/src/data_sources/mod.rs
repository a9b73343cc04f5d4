pub mod spectra;

pub use spectra::{
    SpectraFile,
    SpectraFormat,
    SpectraReader,
    SpectraSource,
};
