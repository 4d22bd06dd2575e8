//! Feature assembly for ML inference
//!
//! Normalized values carry their feature identity in the type
//! (`Scaled<Temperature>`, ...). The assembler places each one by identity,
//! so the vector always comes out in training order, whatever order the
//! caller passes them in. Passing a feature twice does not compile.

use crate::models::{FeatureId, FeatureVector, NUM_FEATURES};
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// Compile-time feature identity
pub trait Feature: sealed::Sealed + Copy + std::fmt::Debug {
    const ID: FeatureId;
}

/// Temperature column marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temperature;

/// Humidity column marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Humidity;

/// Wind speed column marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windspeed;

impl sealed::Sealed for Temperature {}
impl sealed::Sealed for Humidity {}
impl sealed::Sealed for Windspeed {}

impl Feature for Temperature {
    const ID: FeatureId = FeatureId::Temperature;
}

impl Feature for Humidity {
    const ID: FeatureId = FeatureId::Humidity;
}

impl Feature for Windspeed {
    const ID: FeatureId = FeatureId::Windspeed;
}

/// A normalized value tagged with the feature it was scaled for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaled<F: Feature> {
    value: f64,
    _feature: PhantomData<F>,
}

impl<F: Feature> Scaled<F> {
    pub(crate) fn new(value: f64) -> Self {
        Self {
            value,
            _feature: PhantomData,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn feature(&self) -> FeatureId {
        F::ID
    }
}

/// Any permutation of the three scaled features
pub trait ScaledTriple: sealed::Sealed {
    fn into_vector(self) -> FeatureVector;
}

macro_rules! impl_scaled_triple {
    ($($a:ident, $b:ident, $c:ident);* $(;)?) => {$(
        impl sealed::Sealed for (Scaled<$a>, Scaled<$b>, Scaled<$c>) {}

        impl ScaledTriple for (Scaled<$a>, Scaled<$b>, Scaled<$c>) {
            fn into_vector(self) -> FeatureVector {
                let mut values = [0.0f32; NUM_FEATURES];
                values[<$a as Feature>::ID.index()] = self.0.value as f32;
                values[<$b as Feature>::ID.index()] = self.1.value as f32;
                values[<$c as Feature>::ID.index()] = self.2.value as f32;
                FeatureVector::from_ordered(values)
            }
        }
    )*};
}

impl_scaled_triple! {
    Temperature, Humidity, Windspeed;
    Temperature, Windspeed, Humidity;
    Humidity, Temperature, Windspeed;
    Humidity, Windspeed, Temperature;
    Windspeed, Temperature, Humidity;
    Windspeed, Humidity, Temperature;
}

/// Builds the classifier input from normalized features
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Assemble three scaled features into (temperature, humidity, windspeed)
    pub fn assemble<A, B, C>(a: Scaled<A>, b: Scaled<B>, c: Scaled<C>) -> FeatureVector
    where
        A: Feature,
        B: Feature,
        C: Feature,
        (Scaled<A>, Scaled<B>, Scaled<C>): ScaledTriple,
    {
        (a, b, c).into_vector()
    }
}
