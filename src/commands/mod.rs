// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod wallets;
pub mod keys;
pub mod transfer;
pub mod webhook;
pub mod doctor;
